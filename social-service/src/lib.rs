pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{SocialConfig, SwaggerMode};
use crate::middleware::{gateway_middleware, AuthGateway};
use crate::services::{
    AuthService, EmailProvider, FollowService, JwtService, KeyValueCache, PolicyEngine,
    Repositories,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::metrics::metrics,
        handlers::auth::registration::register,
        handlers::auth::registration::verify_email,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::user::create_user,
        handlers::user::get_user,
        handlers::user::list_users,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::session::get_session,
        handlers::session::list_sessions,
        handlers::session::update_session,
        handlers::session::delete_session,
        handlers::tag::create_tag,
        handlers::tag::get_tag,
        handlers::tag::list_tags,
        handlers::tag::update_tag,
        handlers::tag::delete_tag,
        handlers::follower::toggle_follow,
        handlers::follower::list_followers,
        handlers::tweet::create_tweet,
        handlers::tweet::get_tweet,
        handlers::tweet::list_tweets,
        handlers::tweet::update_tweet,
        handlers::tweet::delete_tweet,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::UserList,
            dtos::SessionList,
            dtos::TagList,
            dtos::TweetList,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::VerifyEmailRequest,
            dtos::auth::LoginRequest,
            dtos::auth::AuthResponse,
            dtos::user::CreateUserRequest,
            dtos::user::UpdateUserRequest,
            dtos::session::UpdateSessionRequest,
            dtos::tag::CreateTagRequest,
            dtos::tag::UpdateTagRequest,
            dtos::follower::FollowRequest,
            dtos::follower::FollowResponse,
            dtos::tweet::AttachmentRequest,
            dtos::tweet::CreateTweetRequest,
            dtos::tweet::UpdateTweetRequest,
            models::SanitizedUser,
            models::Session,
            models::Tag,
            models::Tweet,
            models::TweetAttachment,
            models::TweetDetails,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, email verification and sessions"),
        (name = "User", description = "Account management"),
        (name = "Session", description = "Login sessions"),
        (name = "Tag", description = "Tags and follow subscriptions"),
        (name = "Follower", description = "Follow graph"),
        (name = "Tweet", description = "Tweets and attachments"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SocialConfig>,
    pub repos: Repositories,
    pub cache: Arc<dyn KeyValueCache>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub follow: FollowService,
    pub gateway: AuthGateway,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over the given stores and collaborators.
    pub fn new(
        config: SocialConfig,
        repos: Repositories,
        cache: Arc<dyn KeyValueCache>,
        email: Arc<dyn EmailProvider>,
        policy: Arc<dyn PolicyEngine>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_ttl_minutes);
        let auth = AuthService::new(
            repos.users.clone(),
            repos.sessions.clone(),
            cache.clone(),
            email,
            jwt.clone(),
            config.otp.clone(),
        );
        let follow = FollowService::new(repos.followers.clone());
        let gateway = AuthGateway::new(jwt.clone(), repos.sessions.clone(), policy);

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
        );

        Self {
            config: Arc::new(config),
            repos,
            cache,
            jwt,
            auth,
            follow,
            gateway,
            login_rate_limiter,
            register_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/v1/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/v1/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/healthz", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/v1/auth/verify-email", post(handlers::auth::verify_email))
        .route("/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/v1/user",
            post(handlers::user::create_user).put(handlers::user::update_user),
        )
        .route("/v1/user/list", get(handlers::user::list_users))
        .route(
            "/v1/user/:id",
            get(handlers::user::get_user).delete(handlers::user::delete_user),
        )
        .route("/v1/session", axum::routing::put(handlers::session::update_session))
        .route("/v1/session/list", get(handlers::session::list_sessions))
        .route(
            "/v1/session/:id",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        )
        .route(
            "/v1/tag",
            post(handlers::tag::create_tag).put(handlers::tag::update_tag),
        )
        .route("/v1/tag/list", get(handlers::tag::list_tags))
        .route(
            "/v1/tag/:id",
            get(handlers::tag::get_tag).delete(handlers::tag::delete_tag),
        )
        .route("/v1/follower", post(handlers::follower::toggle_follow))
        .route("/v1/follower/list", get(handlers::follower::list_followers))
        .route(
            "/v1/tweet",
            post(handlers::tweet::create_tweet).put(handlers::tweet::update_tweet),
        )
        .route("/v1/tweet/list", get(handlers::tweet::list_tweets))
        .route(
            "/v1/tweet/:id",
            get(handlers::tweet::get_tweet).delete(handlers::tweet::delete_tweet),
        )
        .merge(login_route)
        .merge(register_route);

    if state.config.swagger.enabled == SwaggerMode::Public {
        app = app.merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let origins = &state.config.security.allowed_origins;
    let allowed_origins = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| tracing::error!(%origin, error = %e, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    app
        // Every routed request clears the gateway before its handler runs
        .route_layer(from_fn_with_state(state.gateway.clone(), gateway_middleware))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        }))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

//! Shared setup for social-service integration tests.
//!
//! Builds the full router over the in-memory store, the mock cache and the
//! mock mailer, with the shipped policy table.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use service_core::config::Config;
use social_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, OtpConfig, PolicyConfig, RateLimitConfig,
        RedisConfig, SecurityConfig, SmtpConfig, SocialConfig, SwaggerConfig, SwaggerMode,
    },
    models::{user_status, user_type, Session, User},
    services::{
        CasbinPolicy, Claims, InMemoryStore, MockCache, MockEmailService, Repositories,
        SessionStore, UserRepository,
    },
    AppState,
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SHIPPED_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/rbac.conf");
pub const SHIPPED_POLICY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/policy.csv");
pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub fn test_config() -> SocialConfig {
    SocialConfig {
        common: Config {
            port: 8080,
            otlp_endpoint: None,
        },
        environment: Environment::Dev,
        service_name: "social-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://unused".to_string(),
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            token_ttl_minutes: None,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            email: "noreply@example.com".to_string(),
            password: String::new(),
        },
        otp: OtpConfig::default(),
        policy: PolicyConfig {
            model_path: SHIPPED_MODEL.to_string(),
            path: SHIPPED_POLICY.to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            register_attempts: 100,
            register_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<MockCache>,
    pub mailbox: Arc<MockEmailService>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: SocialConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MockCache::new());
        let mailbox = Arc::new(MockEmailService::new());
        let policy = CasbinPolicy::load(&config.policy.model_path, &config.policy.path)
            .await
            .expect("shipped policy loads");

        let state = AppState::new(
            config,
            Repositories::from_store(store.clone()),
            cache.clone(),
            mailbox.clone(),
            Arc::new(policy),
        );

        Self {
            router: build_router(state.clone()),
            state,
            store,
            cache,
            mailbox,
        }
    }

    /// Send one request; returns the status and the JSON body (`Null` when
    /// the body is empty or not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Insert an active account directly. The stored hash is a placeholder,
    /// so these accounts sign in through [`TestApp::sign_in`], not `/login`.
    pub async fn seed_user(&self, username: &str, kind: &str) -> User {
        let now = Utc::now();
        self.store
            .create_user(User {
                id: Uuid::new_v4(),
                full_name: format!("{} Example", username),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: "not-a-real-hash".to_string(),
                user_type: kind.to_string(),
                user_role: kind.to_string(),
                status: user_status::ACTIVE.to_string(),
                avatar_id: None,
                gender: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed user")
    }

    /// Open a session for `user` and return a credential bound to it.
    pub async fn sign_in(&self, user: &User) -> (String, Session) {
        let now = Utc::now();
        let platform = if user.user_type == user_type::ADMIN {
            "admin"
        } else {
            "web"
        };
        let session = self
            .store
            .create_session(Session {
                id: Uuid::new_v4(),
                user_id: user.id,
                ip_address: "127.0.0.1".to_string(),
                user_agent: "integration-test".to_string(),
                is_active: true,
                expires_at: now + Duration::days(1),
                last_active_at: now,
                platform: platform.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("seed session");

        let claims = Claims::new(
            user.id,
            user.user_role.clone(),
            user.user_type.clone(),
            platform,
            session.id,
        );
        let token = self.state.jwt.issue(&claims).expect("issue token");
        (token, session)
    }

    /// Seed an account and sign it in.
    pub async fn user_with_token(&self, username: &str, kind: &str) -> (User, String) {
        let user = self.seed_user(username, kind).await;
        let (token, _) = self.sign_in(&user).await;
        (user, token)
    }
}

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};

const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'";
const SWAGGER_CSP: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' data:; \
     font-src 'self'; \
     connect-src 'self'";

/// Adds hardening headers. The Swagger UI needs inline assets and same-origin
/// framing; every other route gets a deny-all policy.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let is_swagger_route = req.uri().path().starts_with("/swagger");

    let mut response = next.run(req).await;
    apply_security_headers(response.headers_mut(), is_swagger_route);
    response
}

fn apply_security_headers(headers: &mut HeaderMap, is_swagger_route: bool) {
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    let (csp, frame_options) = if is_swagger_route {
        (SWAGGER_CSP, "SAMEORIGIN")
    } else {
        (API_CSP, "DENY")
    };
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(csp),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static(frame_options),
    );
}

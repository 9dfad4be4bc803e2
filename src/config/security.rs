use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use std::env;
use tower_http::set_header::SetResponseHeaderLayer;

const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const XSS_BLOCK: &str = "1; mode=block";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

fn header_layer(
    name: &'static str,
    value: &'static str,
) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static(name),
        HeaderValue::from_static(value),
    )
}

/// Stacks the API security headers onto the router. HSTS is only added in
/// production, where TLS terminates in front of the service.
pub fn apply_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = router
        .layer(header_layer("x-content-type-options", NOSNIFF))
        .layer(header_layer("x-frame-options", DENY))
        .layer(header_layer("x-xss-protection", XSS_BLOCK))
        .layer(header_layer("content-security-policy", CSP_API_VALUE))
        .layer(header_layer("referrer-policy", REFERRER_POLICY_VALUE))
        .layer(header_layer("permissions-policy", PERMISSIONS_POLICY_VALUE));

    if hsts_enabled() {
        tracing::info!("Security: HSTS header enabled (production mode)");
        router.layer(header_layer("strict-transport-security", HSTS_VALUE))
    } else {
        tracing::info!("Security: HSTS header disabled (development mode)");
        router
    }
}

fn hsts_enabled() -> bool {
    env::var("RUST_ENV")
        .map(|value| value.to_lowercase() == "production")
        .unwrap_or(false)
}

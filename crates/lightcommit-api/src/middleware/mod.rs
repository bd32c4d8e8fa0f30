//! 中间件

pub mod auth;
pub mod cron;

pub use auth::{CurrentUser, require_session};
pub use cron::verify_cron_secret;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// 为所有响应注入 HTTP 安全头
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("referrer-policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    response
}

//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to all responses.
///
/// This API serves JSON to browser clients that carry a session cookie, so:
///
/// - **Cache-Control: no-store** — responses contain account data that must
///   not land in shared caches.
/// - **Referrer-Policy: no-referrer** — nothing about API URLs should leak
///   via the Referer header.
/// - **X-Content-Type-Options: nosniff** — browsers must respect the
///   declared Content-Type.
/// - **X-Frame-Options: DENY** — the API has no business inside a frame.
/// - **Strict-Transport-Security** — the session cookie requires HTTPS;
///   refuse downgrades for 2 years including subdomains.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
    );

    response
}

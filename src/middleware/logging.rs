//! Request logging and request-id middleware
//!
//! Every request gets a UUID request id (unless the client supplied one) and
//! a single structured completion log line with method, path, status and
//! latency.

use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::info;
use uuid::Uuid;

/// Generates a fresh UUID v4 for every request without an x-request-id.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Log one line per completed request.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis();

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = latency_ms as u64,
        request_id = request_id.as_deref().unwrap_or("-"),
        "request completed"
    );

    response
}

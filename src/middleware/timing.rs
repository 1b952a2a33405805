use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Header reporting server-side processing time
pub const RESPONSE_TIME_HEADER: &str = "x-response-time-ms";

/// Middleware state for measuring request processing time
#[derive(Debug, Clone, Copy)]
pub struct TimingMiddleware {
    /// Threshold in milliseconds for slow request logging
    slow_threshold_ms: u64,
}

impl TimingMiddleware {
    /// Create a new timing middleware with the specified threshold
    pub fn new(slow_threshold_ms: u64) -> Self {
        Self { slow_threshold_ms }
    }

    pub fn slow_threshold_ms(&self) -> u64 {
        self.slow_threshold_ms
    }

    fn is_slow(&self, elapsed_ms: u64) -> bool {
        elapsed_ms > self.slow_threshold_ms
    }
}

impl Default for TimingMiddleware {
    /// 500ms threshold
    fn default() -> Self {
        Self::new(500)
    }
}

/// Time the request and attach the elapsed milliseconds as a response header
pub async fn time_requests<B>(
    State(timing): State<TimingMiddleware>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    if timing.is_slow(elapsed_ms) {
        tracing::warn!(
            "Slow request: {} {} took {}ms (threshold: {}ms)",
            method,
            path,
            elapsed_ms,
            timing.slow_threshold_ms
        );
    } else {
        tracing::debug!("Request timing: {} {} took {}ms", method, path, elapsed_ms);
    }

    response
        .headers_mut()
        .insert(RESPONSE_TIME_HEADER, HeaderValue::from(elapsed_ms));

    response
}

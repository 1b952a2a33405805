use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use uuid::Uuid;

use crate::config::LoggingConfig;

/// Header carrying the per-request id back to the caller
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Verbosity of the request logging middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Method, path, status and latency
    Basic,
    /// Also logs request headers at debug level
    Detailed,
}

/// Middleware state for structured request logging
#[derive(Debug, Clone, Copy)]
pub struct LoggingMiddleware {
    log_level: LogLevel,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with the specified log level
    pub fn new(log_level: LogLevel) -> Self {
        Self { log_level }
    }

    /// Create a new logging middleware with basic log level
    pub fn basic() -> Self {
        Self::new(LogLevel::Basic)
    }

    /// Create a new logging middleware with detailed log level
    pub fn detailed() -> Self {
        Self::new(LogLevel::Detailed)
    }

    /// Pick the verbosity matching a configured log level
    pub fn for_config(config: &LoggingConfig) -> Self {
        match config.level.as_str() {
            "trace" | "debug" => Self::detailed(),
            _ => Self::basic(),
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

/// Initialize the tracing system with structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match config.level.as_str() {
            level @ ("trace" | "debug" | "info" | "warn" | "error") => EnvFilter::new(level),
            _ => EnvFilter::new("info"),
        }
    });

    let initialized = if config.json_format {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .json();
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339());
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    if initialized.is_ok() {
        tracing::info!(
            level = %config.level,
            json = config.json_format,
            "Tracing system initialized"
        );
    }
}

/// Generate a unique id for a request
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Log every request inside a span carrying its id, and tag the response with that id
pub async fn log_requests<B>(
    State(logging): State<LoggingMiddleware>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let request_span = tracing::span!(
        Level::INFO,
        "request",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        query = ?uri.query(),
        user_agent = ?request
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok()),
    );

    if logging.log_level == LogLevel::Detailed {
        let _enter = request_span.enter();
        for (name, value) in request.headers() {
            if name.as_str().eq_ignore_ascii_case("authorization") {
                tracing::debug!(header_name = %name, "Authorization header present (value hidden)");
            } else {
                tracing::debug!(header_name = %name, header_value = ?value, "Request header");
            }
        }
    }

    let start = Instant::now();
    let mut response = next.run(request).instrument(request_span.clone()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let _enter = request_span.enter();
    let status_code = response.status().as_u16();
    if response.status().is_server_error() {
        tracing::warn!(status_code, elapsed_ms, "Response: {} {} -> {}", method, uri, status_code);
    } else {
        tracing::info!(status_code, elapsed_ms, "Response: {} {} -> {}", method, uri, status_code);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_config_picks_verbosity() {
        let mut config = LoggingConfig::default();
        assert_eq!(LoggingMiddleware::for_config(&config).log_level(), LogLevel::Basic);

        config.level = "debug".to_string();
        assert_eq!(LoggingMiddleware::for_config(&config).log_level(), LogLevel::Detailed);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        init_tracing(&config);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, OriginalUri, Path, Query, State},
    http::HeaderMap,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use tower_http::trace::TraceLayer;

use crate::config::{QueryDefaults, ServiceConfig};
use crate::error::ServiceError;
use crate::middleware::{log_requests, time_requests, LoggingMiddleware, TimingMiddleware};
use crate::models::{
    CpuResult, EchoResult, HealthStatus, IoDelayResult, MemoryResult, PayloadResult,
};
use crate::service::WorkloadService;
use crate::utils::{parse_header_to_string, parse_leading_int};

/// State shared by the workload handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WorkloadService>,
    pub defaults: QueryDefaults,
}

/// Build the full application router, workload routes mounted under the API prefix
pub fn build_router(service: Arc<WorkloadService>, config: &ServiceConfig) -> Router {
    let state = AppState {
        service,
        defaults: config.defaults,
    };

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/cpu-intensive", get(cpu_intensive))
        .route("/memory-intensive", get(memory_intensive))
        .route("/io-delay", get(io_delay))
        .route("/echo", post(echo))
        .route("/payload/:size", get(variable_payload))
        .with_state(state);

    let prefix = config.server.api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(prefix, api)
    };

    app.fallback(not_found)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            TimingMiddleware::new(config.server.slow_request_threshold_ms),
            time_requests,
        ))
        .layer(middleware::from_fn_with_state(
            LoggingMiddleware::for_config(&config.logging),
            log_requests,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Resolve a numeric query parameter; missing, non-numeric and zero values use the default
pub fn numeric_param(params: &HashMap<String, String>, name: &str, default: i64) -> i64 {
    params
        .get(name)
        .and_then(|raw| parse_leading_int(raw))
        .filter(|value| *value != 0)
        .unwrap_or(default)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.service.health_check())
}

/// CPU workload endpoint
async fn cpu_intensive(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CpuResult>, ServiceError> {
    let n = numeric_param(&params, "n", state.defaults.cpu_n);
    let service = state.service.clone();

    let result = tokio::task::spawn_blocking(move || service.cpu_intensive(n))
        .await
        .map_err(|e| ServiceError::InternalError(format!("cpu workload failed: {}", e)))?;

    Ok(Json(result))
}

/// Memory workload endpoint
async fn memory_intensive(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MemoryResult>, ServiceError> {
    let size = numeric_param(&params, "size", state.defaults.memory_size);
    let service = state.service.clone();

    let result = tokio::task::spawn_blocking(move || service.memory_intensive(size))
        .await
        .map_err(|e| ServiceError::InternalError(format!("memory workload failed: {}", e)))?;

    Ok(Json(result))
}

/// I/O delay endpoint
async fn io_delay(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IoDelayResult> {
    let delay = numeric_param(&params, "delay", state.defaults.io_delay_ms);
    Json(state.service.io_delay(delay).await)
}

/// Echo endpoint - returns the request body with selected headers
async fn echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EchoResult>, ServiceError> {
    let body = if body.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::InvalidRequest(format!("body is not valid JSON: {}", e)))?
    };

    let content_type = headers.get("content-type").and_then(parse_header_to_string);
    let user_agent = headers.get("user-agent").and_then(parse_header_to_string);

    Ok(Json(state.service.echo(body, content_type, user_agent)))
}

/// Variable payload endpoint
async fn variable_payload(
    State(state): State<AppState>,
    Path(size): Path<String>,
) -> Json<PayloadResult> {
    Json(state.service.variable_payload(&size))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ServiceError {
    ServiceError::RouteNotFound(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_numeric_param_defaults() {
        assert_eq!(numeric_param(&params(&[]), "n", 35), 35);
        assert_eq!(numeric_param(&params(&[("n", "abc")]), "n", 35), 35);
        assert_eq!(numeric_param(&params(&[("n", "0")]), "n", 35), 35);
        assert_eq!(numeric_param(&params(&[("n", "")]), "n", 35), 35);
    }

    #[test]
    fn test_numeric_param_lenient_values() {
        assert_eq!(numeric_param(&params(&[("n", "12")]), "n", 35), 12);
        assert_eq!(numeric_param(&params(&[("n", "12px")]), "n", 35), 12);
        assert_eq!(numeric_param(&params(&[("n", "-4")]), "n", 35), -4);
        assert_eq!(numeric_param(&params(&[("size", "100")]), "n", 35), 35);
        assert_eq!(
            numeric_param(&params(&[("size", "99999999999999999999")]), "size", 100_000),
            i64::MAX
        );
    }
}

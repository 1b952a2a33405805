use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::core::routes::build_router;
use crate::error::ServiceError;
use crate::service::WorkloadService;

/// Server state that can be mutated
struct ServerState {
    /// Server handle for graceful shutdown
    server_handle: Option<JoinHandle<()>>,
    /// Shutdown signal sender
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Address actually bound, known once started
    local_addr: Option<SocketAddr>,
}

/// HTTP server hosting the workload endpoints
#[derive(Clone)]
pub struct WorkloadServer {
    config: ServiceConfig,
    service: Arc<WorkloadService>,
    server_state: Arc<Mutex<ServerState>>,
}

impl WorkloadServer {
    /// Create a server with the default configuration
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Create a server with custom configuration
    pub fn with_config(config: ServiceConfig) -> Self {
        let service = Arc::new(WorkloadService::with_limits(config.limits));
        Self {
            config,
            service,
            server_state: Arc::new(Mutex::new(ServerState {
                server_handle: None,
                shutdown_tx: None,
                local_addr: None,
            })),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Bind the listener and serve in a background task
    pub async fn start(&self) -> Result<SocketAddr, ServiceError> {
        let mut server_state = self.server_state.lock().await;
        if server_state.server_handle.is_some() {
            return Err(ServiceError::InternalError(
                "Server is already running".to_string(),
            ));
        }

        self.config.validate()?;
        let app = build_router(self.service.clone(), &self.config);

        let addr: SocketAddr = self
            .config
            .bind_address()
            .parse()
            .map_err(|e| ServiceError::InternalError(format!("Invalid address: {}", e)))?;

        let server = axum::Server::try_bind(&addr)
            .map_err(|e| ServiceError::InternalError(format!("Failed to bind {}: {}", addr, e)))?
            .serve(app.into_make_service());
        let local_addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                tracing::info!("Shutdown signal received, starting graceful shutdown");
            });

            if let Err(e) = graceful.await {
                tracing::error!("Server error: {}", e);
            }

            tracing::info!("Server on {} has been shut down", local_addr);
        });

        server_state.server_handle = Some(server_handle);
        server_state.shutdown_tx = Some(shutdown_tx);
        server_state.local_addr = Some(local_addr);

        tracing::info!(
            "Workload server listening on {} (prefix {})",
            local_addr,
            self.config.server.api_prefix
        );
        Ok(local_addr)
    }

    /// Signal graceful shutdown and wait for in-flight requests to drain
    pub async fn stop(&self) -> Result<(), ServiceError> {
        let mut server_state = self.server_state.lock().await;

        let handle = server_state.server_handle.take().ok_or_else(|| {
            ServiceError::InternalError("Server is not running".to_string())
        })?;

        if let Some(tx) = server_state.shutdown_tx.take() {
            // We don't care if the receiver is dropped
            let _ = tx.send(());
        }
        server_state.local_addr = None;

        handle.await.map_err(|e| {
            tracing::error!("Error while shutting down server: {}", e);
            ServiceError::InternalError(format!("Error while shutting down server: {}", e))
        })?;

        tracing::info!("Server has been shut down gracefully");
        Ok(())
    }

    /// Address the server is bound to, if running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server_state.lock().await.local_addr
    }

    pub async fn is_running(&self) -> bool {
        self.server_state.lock().await.server_handle.is_some()
    }
}

impl Default for WorkloadServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn test_config(port: u16) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.server.port = port;
        config
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let server = WorkloadServer::with_config(test_config(3190));
        assert!(!server.is_running().await);

        let addr = server.start().await.unwrap();
        assert_eq!(addr.port(), 3190);
        assert!(server.is_running().await);
        assert_eq!(server.local_addr().await, Some(addr));

        assert!(server.start().await.is_err());

        server.stop().await.unwrap();
        assert!(!server.is_running().await);
        assert!(server.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_host_is_rejected() {
        let mut config = test_config(3191);
        config.server.host = "not a host".to_string();
        let server = WorkloadServer::with_config(config);
        assert!(server.start().await.is_err());
    }

    #[tokio::test]
    async fn test_unsafe_fibonacci_limit_is_rejected() {
        let mut config = test_config(3192);
        config.limits.max_fibonacci_n = 94;
        let server = WorkloadServer::with_config(config);
        assert!(matches!(
            server.start().await,
            Err(ServiceError::ConfigError(ConfigError::ValidationError(_)))
        ));
        assert!(!server.is_running().await);
    }
}

use tokio::signal;

use synthetic_workload::config::{BasicConfigManager, ConfigManager};
use synthetic_workload::middleware::init_tracing;
use synthetic_workload::{ServiceError, WorkloadServer};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load configuration
    let config_manager = BasicConfigManager::new();
    if let Ok(path) = std::env::var("CONFIG_FILE") {
        config_manager.load_from_file(path).await?;
    }
    config_manager.apply_env_overrides().await?;
    let config = config_manager.get_config().await;

    // Initialize tracing
    init_tracing(&config.logging);

    tracing::info!(
        max_fibonacci_n = config.limits.max_fibonacci_n,
        max_array_size = config.limits.max_array_size,
        max_delay_ms = config.limits.max_delay_ms,
        "Workload limits"
    );

    // Start the server
    let server = WorkloadServer::with_config(config);
    let addr = server.start().await?;
    tracing::info!("Server is running on {}", addr);

    // Wait for Ctrl+C
    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping server");

    server.stop().await?;
    tracing::info!("Server stopped successfully");

    Ok(())
}

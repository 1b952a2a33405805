use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use synthetic_workload::config::{BasicConfigManager, ConfigManager, ServiceConfig};
use synthetic_workload::{ConfigError, WorkloadServer};

#[tokio::test]
async fn test_configuration_reload_from_file() {
    let mut config_file = NamedTempFile::new().expect("Failed to create temp file");
    let initial_config = r#"
{
  "server": { "host": "127.0.0.1", "port": 3140, "api_prefix": "/api" },
  "limits": { "max_fibonacci_n": 30 },
  "logging": { "level": "info" }
}
"#;
    config_file
        .write_all(initial_config.as_bytes())
        .expect("Failed to write config");
    config_file.flush().expect("Failed to flush config");

    let config_manager = Arc::new(BasicConfigManager::new());
    config_manager
        .load_from_file(config_file.path())
        .await
        .expect("Failed to load config");

    let loaded = config_manager.get_config().await;
    assert_eq!(loaded.server.port, 3140);
    assert_eq!(loaded.limits.max_fibonacci_n, 30);
    assert_eq!(loaded.limits.max_delay_ms, 10_000);
    assert_eq!(loaded.defaults.cpu_n, 35);

    let mut new_config_file = NamedTempFile::new().expect("Failed to create new temp file");
    let updated_config = r#"
{
  "server": { "port": 3141, "slow_request_threshold_ms": 50 },
  "limits": { "max_delay_ms": 250 },
  "defaults": { "io_delay_ms": 20 },
  "logging": { "level": "debug", "json_format": true }
}
"#;
    new_config_file
        .write_all(updated_config.as_bytes())
        .expect("Failed to write updated config");
    new_config_file.flush().expect("Failed to flush updated config");

    config_manager
        .load_from_file(new_config_file.path())
        .await
        .expect("Failed to reload config");

    let reloaded = config_manager.get_config().await;
    assert_eq!(reloaded.server.port, 3141);
    assert_eq!(reloaded.server.slow_request_threshold_ms, 50);
    assert_eq!(reloaded.limits.max_delay_ms, 250);
    assert_eq!(reloaded.limits.max_fibonacci_n, 45);
    assert_eq!(reloaded.defaults.io_delay_ms, 20);
    assert_eq!(reloaded.logging.level, "debug");
    assert!(reloaded.logging.json_format);
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("workload.json");

    let mut config = ServiceConfig::default();
    config.server.port = 3142;
    config.limits.max_array_size = 1_234;

    let writer = BasicConfigManager::with_config(config.clone());
    writer.save_to_file(&path).await.expect("Failed to save config");

    let reader = BasicConfigManager::new();
    reader.load_from_file(&path).await.expect("Failed to load config");
    assert_eq!(reader.get_config().await, config);
}

#[tokio::test]
async fn test_invalid_files_are_rejected() {
    let manager = BasicConfigManager::new();

    let missing = manager.load_from_file("/definitely/not/here.json").await;
    assert!(matches!(missing, Err(ConfigError::LoadError(_))));

    let mut garbage = NamedTempFile::new().unwrap();
    garbage.write_all(b"server = 1").unwrap();
    garbage.flush().unwrap();
    let result = manager.load_from_file(garbage.path()).await;
    assert!(matches!(result, Err(ConfigError::LoadError(_))));

    let mut invalid = NamedTempFile::new().unwrap();
    invalid
        .write_all(br#"{"server": {"api_prefix": "no-slash"}}"#)
        .unwrap();
    invalid.flush().unwrap();
    let result = manager.load_from_file(invalid.path()).await;
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    // failed loads leave the previous configuration in place
    assert_eq!(manager.get_config().await, ServiceConfig::default());
}

#[tokio::test]
async fn test_loaded_limits_reach_the_server() {
    let mut config_file = NamedTempFile::new().unwrap();
    config_file
        .write_all(br#"{"server": {"port": 3143}, "limits": {"max_fibonacci_n": 10}}"#)
        .unwrap();
    config_file.flush().unwrap();

    let manager = BasicConfigManager::new();
    manager.load_from_file(config_file.path()).await.unwrap();

    let server = WorkloadServer::with_config(manager.get_config().await);
    server.start().await.unwrap();

    let body = reqwest::get("http://127.0.0.1:3143/api/cpu-intensive?n=40")
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(body["result"], 55);
    assert_eq!(body["input"], 40);

    server.stop().await.unwrap();
}

// Synthetic Workload Service Library

pub mod config;
pub mod core;
pub mod error;
pub mod loadgen;
pub mod middleware;
pub mod models;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use config::{ServiceConfig, WorkloadLimits};
pub use crate::core::{routes::build_router, server::WorkloadServer};
pub use error::{ConfigError, LoadTestError, ServiceError};
pub use models::{
    CpuResult, EchoResult, HealthStatus, IoDelayResult, MemoryResult, PayloadItem, PayloadResult,
    PayloadSize,
};
pub use service::WorkloadService;

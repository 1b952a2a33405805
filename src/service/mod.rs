//! Synthetic workload operations.
//!
//! Every operation is total over its inputs: out-of-range sizes are clamped to
//! the configured [`WorkloadLimits`] and negative sizes are treated as zero.
//! Nothing is shared between calls apart from the immutable limits.

use std::hint::black_box;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::WorkloadLimits;
use crate::models::{
    CpuResult, EchoHeaders, EchoResult, HealthStatus, IoDelayResult, MemoryResult, PayloadItem,
    PayloadResult, PayloadSize, Status,
};
use crate::utils::{duration_to_millis, epoch_millis};

/// Record allocated by the memory workload
struct MemoryRecord {
    #[allow(dead_code)]
    id: usize,
    value: f64,
    tag: String,
}

/// Stateless workload simulator
#[derive(Debug, Clone, Default)]
pub struct WorkloadService {
    limits: WorkloadLimits,
}

impl WorkloadService {
    /// Create a service with the default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service with custom limits
    pub fn with_limits(limits: WorkloadLimits) -> Self {
        Self { limits }
    }

    /// Liveness probe
    pub fn health_check(&self) -> HealthStatus {
        HealthStatus {
            status: Status::Ok,
            timestamp: epoch_millis(),
        }
    }

    /// Compute F(min(n, limit)) with the exponential recursion
    pub fn cpu_intensive(&self, n: i64) -> CpuResult {
        let limited_n = n.clamp(0, i64::from(self.limits.max_fibonacci_n)) as u32;
        let start = Instant::now();

        let result = fibonacci(black_box(limited_n));
        let duration_ms = duration_to_millis(start.elapsed());

        tracing::debug!(input = n, limited_n, result, duration_ms, "cpu workload done");

        CpuResult {
            result,
            input: n,
            duration_ms,
        }
    }

    /// Allocate `min(size, limit)` records and sum their random values
    pub fn memory_intensive(&self, size: i64) -> MemoryResult {
        let limited_size = clamp_to(size, self.limits.max_array_size as u64) as usize;
        let start = Instant::now();

        let mut rng = rand::thread_rng();
        let records: Vec<MemoryRecord> = (0..limited_size)
            .map(|i| MemoryRecord {
                id: i,
                value: rng.gen::<f64>(),
                tag: format!("item-{}", i),
            })
            .collect();

        let sum: f64 = records.iter().map(|r| r.value).sum();
        let tag_bytes: usize = records.iter().map(|r| r.tag.len()).sum();
        black_box(&records);
        let duration_ms = duration_to_millis(start.elapsed());

        tracing::debug!(
            requested = size,
            array_size = limited_size,
            tag_bytes,
            duration_ms,
            "memory workload done"
        );

        MemoryResult {
            array_size: limited_size,
            sum: format!("{:.2}", sum),
            duration_ms,
        }
    }

    /// Suspend the calling task for at least `min(delay, limit)` milliseconds
    pub async fn io_delay(&self, delay: i64) -> IoDelayResult {
        let limited_delay = clamp_to(delay, self.limits.max_delay_ms);
        let start = Instant::now();
        let deadline = tokio::time::Instant::from_std(start) + Duration::from_millis(limited_delay);

        // Timer wheels may fire a hair early on some platforms
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep_until(deadline).await;
        }

        let actual_duration_ms = duration_to_millis(start.elapsed());

        tracing::debug!(
            requested = delay,
            limited_delay,
            actual_duration_ms,
            "io delay done"
        );

        IoDelayResult {
            requested_delay: limited_delay,
            actual_duration_ms,
        }
    }

    /// Reflect the body and the content-type / user-agent headers
    pub fn echo(
        &self,
        body: serde_json::Value,
        content_type: Option<String>,
        user_agent: Option<String>,
    ) -> EchoResult {
        EchoResult {
            received_at: epoch_millis(),
            body,
            headers: EchoHeaders {
                content_type,
                user_agent,
            },
        }
    }

    /// Generate the item list for a size class; unknown labels resolve to small
    pub fn variable_payload(&self, size_class: &str) -> PayloadResult {
        let size = PayloadSize::from_label(size_class);
        let item_count = size.item_count();

        let mut rng = rand::thread_rng();
        let data = (0..item_count)
            .map(|id| PayloadItem {
                id,
                name: format!("Item {}", id),
                value: rng.gen::<f64>(),
            })
            .collect();

        tracing::debug!(requested = size_class, %size, item_count, "payload generated");

        PayloadResult {
            size,
            item_count,
            data,
        }
    }
}

/// Canonical recursive Fibonacci; exponential on purpose
pub fn fibonacci(n: u32) -> u64 {
    if n <= 1 {
        return u64::from(n);
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

fn clamp_to(value: i64, max: u64) -> u64 {
    if value <= 0 {
        0
    } else {
        (value as u64).min(max)
    }
}

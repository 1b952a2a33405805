// Result models for the workload endpoints

use std::fmt;

use serde::{Deserialize, Serialize};

/// Liveness status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `ok` while the process answers
    pub status: Status,

    /// Epoch milliseconds
    pub timestamp: i64,
}

/// CPU workload response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuResult {
    /// Fibonacci value of the clamped input
    pub result: u64,

    /// Input as received, before clamping
    pub input: i64,

    /// Wall-clock time spent computing
    pub duration_ms: u64,
}

/// Memory workload response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResult {
    /// Number of records allocated
    pub array_size: usize,

    /// Sum of the random values, two fractional digits
    pub sum: String,

    /// Wall-clock time spent allocating and summing
    pub duration_ms: u64,
}

/// I/O delay response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoDelayResult {
    /// Clamped delay in milliseconds
    pub requested_delay: u64,

    /// Measured suspension, never below `requested_delay`
    pub actual_duration_ms: u64,
}

/// Header values reflected by the echo endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoHeaders {
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
}

/// Echo response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResult {
    /// Epoch milliseconds at receipt
    pub received_at: i64,

    /// Request body, untouched
    pub body: serde_json::Value,

    pub headers: EchoHeaders,
}

/// Size class of a generated payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSize {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl PayloadSize {
    /// All size classes, smallest first
    pub const ALL: [PayloadSize; 4] = [
        PayloadSize::Small,
        PayloadSize::Medium,
        PayloadSize::Large,
        PayloadSize::Xlarge,
    ];

    /// Resolve a size label; anything unrecognized is `Small`
    pub fn from_label(label: &str) -> Self {
        match label {
            "medium" => PayloadSize::Medium,
            "large" => PayloadSize::Large,
            "xlarge" => PayloadSize::Xlarge,
            _ => PayloadSize::Small,
        }
    }

    /// Number of items generated for this class
    pub fn item_count(self) -> usize {
        match self {
            PayloadSize::Small => 100,
            PayloadSize::Medium => 1_000,
            PayloadSize::Large => 10_000,
            PayloadSize::Xlarge => 100_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadSize::Small => "small",
            PayloadSize::Medium => "medium",
            PayloadSize::Large => "large",
            PayloadSize::Xlarge => "xlarge",
        }
    }
}

impl fmt::Display for PayloadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generated payload record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadItem {
    pub id: usize,
    pub name: String,

    /// Uniform random in [0, 1)
    pub value: f64,
}

/// Variable payload response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadResult {
    /// Resolved size class
    pub size: PayloadSize,
    pub item_count: usize,
    pub data: Vec<PayloadItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_size_lookup() {
        assert_eq!(PayloadSize::from_label("small").item_count(), 100);
        assert_eq!(PayloadSize::from_label("medium").item_count(), 1_000);
        assert_eq!(PayloadSize::from_label("large").item_count(), 10_000);
        assert_eq!(PayloadSize::from_label("xlarge").item_count(), 100_000);
        assert_eq!(PayloadSize::from_label("MEDIUM"), PayloadSize::Small);
        assert_eq!(PayloadSize::from_label(""), PayloadSize::Small);
    }

    #[test]
    fn test_camel_case_field_names() {
        let cpu = CpuResult {
            result: 55,
            input: 10,
            duration_ms: 0,
        };
        let value = serde_json::to_value(&cpu).unwrap();
        assert_eq!(value, json!({"result": 55, "input": 10, "durationMs": 0}));

        let io = IoDelayResult {
            requested_delay: 5,
            actual_duration_ms: 6,
        };
        let value = serde_json::to_value(&io).unwrap();
        assert_eq!(value["requestedDelay"], 5);
        assert_eq!(value["actualDurationMs"], 6);
    }

    #[test]
    fn test_echo_headers_serialize_null_when_absent() {
        let echo = EchoResult {
            received_at: 1,
            body: json!({"a": [1, null]}),
            headers: EchoHeaders::default(),
        };
        let value = serde_json::to_value(&echo).unwrap();
        assert_eq!(value["headers"], json!({"contentType": null, "userAgent": null}));
        assert_eq!(value["receivedAt"], 1);
    }

    #[test]
    fn test_health_status_serializes_ok() {
        let health = HealthStatus {
            status: Status::Ok,
            timestamp: 42,
        };
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["status"], "ok");
    }
}

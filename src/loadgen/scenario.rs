//! The per-iteration request sequence run by every virtual user.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::loadgen::metrics::Metrics;
use crate::utils::epoch_millis;

/// Endpoints exercised by the scenario, in iteration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Cpu,
    Memory,
    IoDelay,
    Echo,
    Payload,
}

impl Endpoint {
    pub const SEQUENCE: [Endpoint; 6] = [
        Endpoint::Health,
        Endpoint::Cpu,
        Endpoint::Memory,
        Endpoint::IoDelay,
        Endpoint::Echo,
        Endpoint::Payload,
    ];

    /// Name of the latency trend for this endpoint
    pub fn trend_name(self) -> &'static str {
        match self {
            Endpoint::Health => "health_check_duration",
            Endpoint::Cpu => "cpu_intensive_duration",
            Endpoint::Memory => "memory_intensive_duration",
            Endpoint::IoDelay => "io_delay_duration",
            Endpoint::Echo => "echo_duration",
            Endpoint::Payload => "payload_duration",
        }
    }

    /// Prefix used in check names
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Health => "health",
            Endpoint::Cpu => "cpu",
            Endpoint::Memory => "memory",
            Endpoint::IoDelay => "io",
            Endpoint::Echo => "echo",
            Endpoint::Payload => "payload",
        }
    }
}

/// Outcome of a single named check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
}

/// Evaluate the status check and the shape check for one response.
///
/// `status` is `None` when the request never produced a response.
pub fn evaluate(endpoint: Endpoint, status: Option<u16>, body: Option<&Value>) -> Vec<CheckOutcome> {
    let label = endpoint.label();
    let status_ok = status == Some(200);

    let (shape_name, shape_ok) = match endpoint {
        Endpoint::Health => (
            "response has status ok",
            body.and_then(|b| b.get("status")).and_then(Value::as_str) == Some("ok"),
        ),
        Endpoint::Cpu => (
            "has result",
            body.and_then(|b| b.get("result")).map_or(false, |v| !v.is_null()),
        ),
        Endpoint::Memory => (
            "has arraySize",
            body.and_then(|b| b.get("arraySize")).map_or(false, |v| !v.is_null()),
        ),
        Endpoint::IoDelay => {
            let field = |name: &str| {
                body.and_then(|b| b.get(name))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
            };
            (
                "actual delay >= requested",
                body.is_some() && field("actualDurationMs") >= field("requestedDelay"),
            )
        }
        Endpoint::Echo => (
            "body echoed",
            body.and_then(|b| b.pointer("/body/action")).and_then(Value::as_str)
                == Some("load-test"),
        ),
        Endpoint::Payload => (
            "has data array",
            body.and_then(|b| b.get("data")).map_or(false, Value::is_array),
        ),
    };

    vec![
        CheckOutcome {
            name: format!("{}: status is 200", label),
            passed: status_ok,
        },
        CheckOutcome {
            name: format!("{}: {}", label, shape_name),
            passed: shape_ok,
        },
    ]
}

/// One virtual user's view of the target service
pub struct Scenario {
    client: Client,
    base_url: String,
    think_time: Duration,
    metrics: Arc<Metrics>,
}

impl Scenario {
    pub fn new(client: Client, base_url: &str, think_time: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            think_time,
            metrics,
        }
    }

    /// Run the six requests in order, pausing between them
    pub async fn run_iteration(&self) {
        for endpoint in Endpoint::SEQUENCE {
            self.run_step(endpoint).await;
            sleep(self.think_time).await;
        }
        self.metrics.add_iteration();
    }

    /// Issue one request, record its latency and checks. No retries.
    pub async fn run_step(&self, endpoint: Endpoint) -> bool {
        let request = self.build_request(endpoint);

        let start = Instant::now();
        let response = request.send().await;
        let elapsed = start.elapsed();
        self.metrics.add_request();

        let (status, body) = match response {
            Ok(response) => {
                self.metrics
                    .record_duration(endpoint.trend_name(), elapsed)
                    .await;
                let status = response.status().as_u16();
                let body = response.json::<Value>().await.ok();
                (Some(status), body)
            }
            Err(e) => {
                tracing::debug!(endpoint = endpoint.label(), error = %e, "request failed");
                (None, None)
            }
        };

        let outcomes = evaluate(endpoint, status, body.as_ref());
        let mut success = true;
        for outcome in &outcomes {
            self.metrics.record_check(&outcome.name, outcome.passed).await;
            success &= outcome.passed;
        }
        self.metrics.add_error_sample(!success);
        success
    }

    fn build_request(&self, endpoint: Endpoint) -> reqwest::RequestBuilder {
        let base = &self.base_url;
        match endpoint {
            Endpoint::Health => self.client.get(format!("{}/api/health", base)),
            Endpoint::Cpu => {
                let n = rand::thread_rng().gen_range(30..40);
                self.client.get(format!("{}/api/cpu-intensive?n={}", base, n))
            }
            Endpoint::Memory => {
                let size = pick(&[10_000, 50_000, 100_000]);
                self.client
                    .get(format!("{}/api/memory-intensive?size={}", base, size))
            }
            Endpoint::IoDelay => {
                let delay = pick(&[50, 100, 200]);
                self.client.get(format!("{}/api/io-delay?delay={}", base, delay))
            }
            Endpoint::Echo => {
                let payload = json!({
                    "userId": rand::thread_rng().gen_range(0..1000),
                    "action": "load-test",
                    "timestamp": epoch_millis(),
                });
                self.client.post(format!("{}/api/echo", base)).json(&payload)
            }
            Endpoint::Payload => {
                let size = pick(&["small", "medium", "large"]);
                self.client.get(format!("{}/api/payload/{}", base, size))
            }
        }
    }
}

fn pick<T: Copy>(choices: &[T]) -> T {
    *choices
        .choose(&mut rand::thread_rng())
        .unwrap_or(&choices[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(outcomes: &[CheckOutcome]) -> bool {
        outcomes.iter().all(|o| o.passed)
    }

    #[test]
    fn test_health_checks() {
        let body = json!({"status": "ok", "timestamp": 1});
        let outcomes = evaluate(Endpoint::Health, Some(200), Some(&body));
        assert!(passed(&outcomes));
        assert_eq!(outcomes[0].name, "health: status is 200");
        assert_eq!(outcomes[1].name, "health: response has status ok");

        let outcomes = evaluate(Endpoint::Health, Some(503), Some(&body));
        assert!(!outcomes[0].passed);
        assert!(outcomes[1].passed);
    }

    #[test]
    fn test_io_delay_check_compares_fields() {
        let ok = json!({"requestedDelay": 100, "actualDurationMs": 101});
        assert!(passed(&evaluate(Endpoint::IoDelay, Some(200), Some(&ok))));

        let early = json!({"requestedDelay": 100, "actualDurationMs": 99});
        assert!(!passed(&evaluate(Endpoint::IoDelay, Some(200), Some(&early))));
    }

    #[test]
    fn test_shape_checks() {
        let cpu = json!({"result": 0, "input": 0, "durationMs": 0});
        assert!(passed(&evaluate(Endpoint::Cpu, Some(200), Some(&cpu))));

        let memory = json!({"arraySize": 10, "sum": "4.20", "durationMs": 1});
        assert!(passed(&evaluate(Endpoint::Memory, Some(200), Some(&memory))));

        let echo = json!({"body": {"action": "load-test"}});
        assert!(passed(&evaluate(Endpoint::Echo, Some(200), Some(&echo))));
        let wrong_echo = json!({"body": {"action": "other"}});
        assert!(!passed(&evaluate(Endpoint::Echo, Some(200), Some(&wrong_echo))));

        let payload = json!({"data": []});
        assert!(passed(&evaluate(Endpoint::Payload, Some(200), Some(&payload))));
        let not_array = json!({"data": {}});
        assert!(!passed(&evaluate(Endpoint::Payload, Some(200), Some(&not_array))));
    }

    #[test]
    fn test_missing_response_fails_everything() {
        for endpoint in Endpoint::SEQUENCE {
            let outcomes = evaluate(endpoint, None, None);
            assert_eq!(outcomes.len(), 2);
            assert!(outcomes.iter().all(|o| !o.passed), "{:?}", endpoint);
        }
    }
}

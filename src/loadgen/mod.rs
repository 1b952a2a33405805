//! Ramping load generator for the workload endpoints.
//!
//! Each virtual user runs the six-request [`Scenario`] in a loop while a
//! [`RampingExecutor`] grows and shrinks the user count along the configured
//! stages. Latency trends, check tallies and the error rate are collected into
//! [`Metrics`] and reduced to a [`LoadTestSummary`] judged against [`Thresholds`].

pub mod executor;
pub mod metrics;
pub mod scenario;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LoadTestError;

pub use executor::{default_stages, total_duration, RampingExecutor, Stage};
pub use metrics::{CheckStats, Metrics, Trend, TrendStats};
pub use scenario::{Endpoint, Scenario};

/// Pass/fail limits for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Ceiling for the 95th percentile of all request durations
    pub p95_ms: f64,

    /// Ceiling for the fraction of failed samples
    pub max_error_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            p95_ms: 2000.0,
            max_error_rate: 0.1,
        }
    }
}

/// Load test configuration
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    pub base_url: String,
    pub stages: Vec<Stage>,
    pub start_vus: usize,
    /// Pause after each request within an iteration
    pub think_time: Duration,
    pub request_timeout: Duration,
    /// Time running users get to finish once the schedule ends
    pub graceful_stop: Duration,
    pub thresholds: Thresholds,
    pub results_dir: PathBuf,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            stages: default_stages(),
            start_vus: 0,
            think_time: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
            graceful_stop: Duration::from_secs(30),
            thresholds: Thresholds::default(),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl LoadTestConfig {
    pub fn max_vus(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .max()
            .unwrap_or(0)
            .max(self.start_vus)
    }
}

/// Verdict on a single threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub condition: String,
    pub observed: f64,
    pub passed: bool,
}

/// Outcome of a load test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestSummary {
    pub started_at: String,
    pub duration_secs: f64,
    pub vus_max: usize,
    pub iterations: u64,
    pub total_requests: u64,
    pub error_rate: f64,
    pub http_req_duration: TrendStats,
    pub endpoints: BTreeMap<String, TrendStats>,
    pub checks: BTreeMap<String, CheckStats>,
    pub thresholds: Vec<ThresholdResult>,
}

impl LoadTestSummary {
    /// Whether every threshold held
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    /// Human-readable report
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, " load test started at {}", self.started_at);
        let _ = writeln!(
            out,
            " duration: {:.2}s, max VUs: {}, iterations: {}",
            self.duration_secs, self.vus_max, self.iterations
        );
        let _ = writeln!(out);

        for (name, stats) in &self.checks {
            let total = stats.passes + stats.fails;
            let mark = if stats.fails == 0 { "✓" } else { "✗" };
            let _ = writeln!(out, "   {} {} ({}/{})", mark, name, stats.passes, total);
        }
        let _ = writeln!(out);

        let mut trend_line = |name: &str, s: &TrendStats| {
            let _ = writeln!(
                out,
                " {:.<28} avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
                name, s.avg, s.min, s.med, s.max, s.p90, s.p95
            );
        };
        for (name, stats) in &self.endpoints {
            trend_line(name, stats);
        }
        trend_line("http_req_duration", &self.http_req_duration);

        let _ = writeln!(
            out,
            " {:.<28} {:.2}%",
            "errors",
            self.error_rate * 100.0
        );
        let _ = writeln!(out, " {:.<28} {}", "total_requests", self.total_requests);
        let _ = writeln!(out);

        for threshold in &self.thresholds {
            let mark = if threshold.passed { "✓" } else { "✗" };
            let _ = writeln!(
                out,
                " {} {} {} (observed {:.4})",
                mark, threshold.metric, threshold.condition, threshold.observed
            );
        }
        out
    }

    /// Write the JSON summary into `dir`, returning the file path
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, LoadTestError> {
        std::fs::create_dir_all(dir)?;
        let stamp = chrono::Utc::now()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let path = dir.join(format!("summary-{}.json", stamp));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Judge collected numbers against the thresholds
pub fn evaluate_thresholds(
    thresholds: &Thresholds,
    http_req_duration: &TrendStats,
    error_rate: f64,
) -> Vec<ThresholdResult> {
    vec![
        ThresholdResult {
            metric: "http_req_duration".to_string(),
            condition: format!("p(95)<{}", thresholds.p95_ms),
            observed: http_req_duration.p95,
            passed: http_req_duration.p95 < thresholds.p95_ms,
        },
        ThresholdResult {
            metric: "errors".to_string(),
            condition: format!("rate<{}", thresholds.max_error_rate),
            observed: error_rate,
            passed: error_rate < thresholds.max_error_rate,
        },
    ]
}

/// Check the target is up, run the schedule, and summarize
pub async fn run(config: &LoadTestConfig) -> Result<LoadTestSummary, LoadTestError> {
    if config.stages.is_empty() {
        return Err(LoadTestError::InvalidConfig("no stages configured".to_string()));
    }

    let client = Client::builder().timeout(config.request_timeout).build()?;
    let base_url = config.base_url.trim_end_matches('/');

    tracing::info!("Load Test Started");
    tracing::info!(
        target_url = %base_url,
        max_vus = config.max_vus(),
        planned_secs = total_duration(&config.stages).as_secs_f64(),
        "Target"
    );

    let health = client.get(format!("{}/api/health", base_url)).send().await?;
    if health.status().as_u16() != 200 {
        return Err(LoadTestError::Unhealthy(health.status().as_u16()));
    }

    let started_at = chrono::Utc::now().to_rfc3339();
    let start = Instant::now();
    let metrics = Arc::new(Metrics::new());
    let scenario = Arc::new(Scenario::new(
        client,
        base_url,
        config.think_time,
        metrics.clone(),
    ));

    let executor = RampingExecutor::new(config.stages.clone(), config.start_vus, config.graceful_stop);
    let vus_max = executor.run(scenario).await;

    let duration = start.elapsed();
    tracing::info!("Load Test Completed in {:.2}s", duration.as_secs_f64());

    let http_req_duration = metrics.http_req_duration().await;
    let error_rate = metrics.error_rate();

    Ok(LoadTestSummary {
        started_at,
        duration_secs: duration.as_secs_f64(),
        vus_max,
        iterations: metrics.iterations(),
        total_requests: metrics.total_requests(),
        error_rate,
        thresholds: evaluate_thresholds(&config.thresholds, &http_req_duration, error_rate),
        http_req_duration,
        endpoints: metrics.endpoint_stats().await,
        checks: metrics.check_stats().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with_p95(p95: f64) -> TrendStats {
        TrendStats {
            count: 10,
            p95,
            ..TrendStats::default()
        }
    }

    #[test]
    fn test_thresholds() {
        let thresholds = Thresholds::default();

        let results = evaluate_thresholds(&thresholds, &stats_with_p95(150.0), 0.01);
        assert!(results.iter().all(|r| r.passed));

        let results = evaluate_thresholds(&thresholds, &stats_with_p95(2500.0), 0.01);
        assert!(!results[0].passed);
        assert!(results[1].passed);

        let results = evaluate_thresholds(&thresholds, &stats_with_p95(10.0), 0.1);
        assert!(!results[1].passed);
    }

    #[test]
    fn test_max_vus() {
        let config = LoadTestConfig::default();
        assert_eq!(config.max_vus(), 10);
    }

    #[test]
    fn test_summary_text_and_json() {
        let http_req_duration = stats_with_p95(120.0);
        let summary = LoadTestSummary {
            started_at: "2026-01-01T00:00:00Z".to_string(),
            duration_secs: 1.5,
            vus_max: 2,
            iterations: 3,
            total_requests: 18,
            error_rate: 0.0,
            http_req_duration,
            endpoints: BTreeMap::new(),
            checks: BTreeMap::from([(
                "health: status is 200".to_string(),
                CheckStats { passes: 3, fails: 0 },
            )]),
            thresholds: evaluate_thresholds(&Thresholds::default(), &http_req_duration, 0.0),
        };

        assert!(summary.passed());
        let text = summary.to_text();
        assert!(text.contains("health: status is 200"));
        assert!(text.contains("http_req_duration"));

        let dir = tempfile::tempdir().unwrap();
        let path = summary.write_json(dir.path()).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["total_requests"], 18);
        assert_eq!(written["vus_max"], 2);
    }
}

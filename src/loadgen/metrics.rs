use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Summary statistics of a latency trend, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub count: usize,
    pub min: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
}

/// Collected latency samples for one metric
#[derive(Debug, Clone, Default)]
pub struct Trend {
    samples: Vec<f64>,
}

impl Trend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value_ms: f64) {
        self.samples.push(value_ms);
    }

    pub fn add_duration(&mut self, duration: Duration) {
        self.add(duration.as_secs_f64() * 1000.0);
    }

    /// Compute summary statistics; percentiles interpolate linearly between ranks
    pub fn stats(&self) -> TrendStats {
        if self.samples.is_empty() {
            return TrendStats::default();
        }

        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = sorted.iter().sum();
        TrendStats {
            count: sorted.len(),
            min: sorted[0],
            avg: sum / sorted.len() as f64,
            med: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p95: percentile(&sorted, 95.0),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Percentile of an ascending, non-empty slice
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Pass/fail tally of a named check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
}

/// Metrics shared by every virtual user of a run
#[derive(Debug, Default)]
pub struct Metrics {
    endpoint_trends: Mutex<HashMap<&'static str, Trend>>,
    http_req_duration: Mutex<Trend>,
    checks: Mutex<BTreeMap<String, CheckStats>>,
    error_count: AtomicU64,
    error_samples: AtomicU64,
    total_requests: AtomicU64,
    iterations: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request's latency under its endpoint trend
    pub async fn record_duration(&self, trend_name: &'static str, duration: Duration) {
        self.endpoint_trends
            .lock()
            .await
            .entry(trend_name)
            .or_default()
            .add_duration(duration);
        self.http_req_duration.lock().await.add_duration(duration);
    }

    pub fn add_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Add one sample to the error rate
    pub fn add_error_sample(&self, failed: bool) {
        self.error_samples.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn record_check(&self, name: &str, passed: bool) {
        let mut checks = self.checks.lock().await;
        let stats = checks.entry(name.to_string()).or_default();
        if passed {
            stats.passes += 1;
        } else {
            stats.fails += 1;
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Fraction of failed samples, 0 when nothing was recorded
    pub fn error_rate(&self) -> f64 {
        let samples = self.error_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        self.error_count.load(Ordering::Relaxed) as f64 / samples as f64
    }

    pub async fn http_req_duration(&self) -> TrendStats {
        self.http_req_duration.lock().await.stats()
    }

    pub async fn endpoint_stats(&self) -> BTreeMap<String, TrendStats> {
        self.endpoint_trends
            .lock()
            .await
            .iter()
            .map(|(name, trend)| (name.to_string(), trend.stats()))
            .collect()
    }

    pub async fn check_stats(&self) -> BTreeMap<String, CheckStats> {
        self.checks.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (1..=11).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 50.0), 6.0);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 11.0);
        assert!((percentile(&sorted, 95.0) - 10.5).abs() < 1e-9);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
    }

    #[test]
    fn test_trend_stats() {
        let mut trend = Trend::new();
        for value in [40.0, 10.0, 30.0, 20.0] {
            trend.add(value);
        }
        let stats = trend.stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.avg, 25.0);
        assert_eq!(stats.med, 25.0);
        assert_eq!(Trend::new().stats(), TrendStats::default());
    }

    #[tokio::test]
    async fn test_metrics_error_rate_and_checks() {
        let metrics = Metrics::new();
        assert_eq!(metrics.error_rate(), 0.0);

        metrics.add_error_sample(false);
        metrics.add_error_sample(false);
        metrics.add_error_sample(false);
        metrics.add_error_sample(true);
        assert_eq!(metrics.error_rate(), 0.25);

        metrics.record_check("health: status is 200", true).await;
        metrics.record_check("health: status is 200", false).await;
        let checks = metrics.check_stats().await;
        assert_eq!(
            checks["health: status is 200"],
            CheckStats { passes: 1, fails: 1 }
        );
    }

    #[tokio::test]
    async fn test_metrics_record_duration() {
        let metrics = Metrics::new();
        metrics
            .record_duration("io_delay_duration", Duration::from_millis(120))
            .await;
        metrics
            .record_duration("payload_duration", Duration::from_millis(20))
            .await;

        let endpoints = metrics.endpoint_stats().await;
        assert_eq!(endpoints["io_delay_duration"].count, 1);
        assert_eq!(metrics.http_req_duration().await.count, 2);
        assert_eq!(metrics.http_req_duration().await.max, 120.0);
    }
}

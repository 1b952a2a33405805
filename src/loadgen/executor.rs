use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::loadgen::scenario::Scenario;

/// One segment of the ramp: move linearly to `target` users over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Default schedule: ramp to 5 over 10s, to 10 over 30s, down to 0 over 10s
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(Duration::from_secs(10), 5),
        Stage::new(Duration::from_secs(30), 10),
        Stage::new(Duration::from_secs(10), 0),
    ]
}

/// Total length of a schedule
pub fn total_duration(stages: &[Stage]) -> Duration {
    stages.iter().map(|s| s.duration).sum()
}

/// Number of users the schedule asks for at `elapsed`, or `None` once it has ended
pub fn target_at(stages: &[Stage], start_vus: usize, elapsed: Duration) -> Option<usize> {
    let mut from = start_vus as f64;
    let mut stage_start = Duration::ZERO;

    for stage in stages {
        let stage_end = stage_start + stage.duration;
        if elapsed < stage_end {
            let progress = if stage.duration.is_zero() {
                1.0
            } else {
                (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64()
            };
            let to = stage.target as f64;
            return Some((from + (to - from) * progress).round() as usize);
        }
        from = stage.target as f64;
        stage_start = stage_end;
    }

    None
}

struct VirtualUser {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Drives virtual users along a ramping schedule
pub struct RampingExecutor {
    stages: Vec<Stage>,
    start_vus: usize,
    graceful_stop: Duration,
    tick: Duration,
}

impl RampingExecutor {
    pub fn new(stages: Vec<Stage>, start_vus: usize, graceful_stop: Duration) -> Self {
        Self {
            stages,
            start_vus,
            graceful_stop,
            tick: Duration::from_millis(100),
        }
    }

    /// Run the schedule to completion, returning the peak number of concurrent users.
    ///
    /// Users retired during ramp-down finish their current iteration. When the
    /// schedule ends, users still running get `graceful_stop` to finish before
    /// they are aborted.
    pub async fn run(&self, scenario: Arc<Scenario>) -> usize {
        let started = Instant::now();
        let mut users: Vec<VirtualUser> = Vec::new();
        let mut retired: Vec<JoinHandle<()>> = Vec::new();
        let mut peak = 0;

        while let Some(target) = target_at(&self.stages, self.start_vus, started.elapsed()) {
            while users.len() < target {
                users.push(spawn_user(scenario.clone()));
            }
            while users.len() > target {
                if let Some(user) = users.pop() {
                    user.stop.store(true, Ordering::Relaxed);
                    retired.push(user.handle);
                }
            }
            if users.len() > peak {
                tracing::debug!(vus = users.len(), "new peak of virtual users");
                peak = users.len();
            }
            sleep(self.tick).await;
        }

        for user in &users {
            user.stop.store(true, Ordering::Relaxed);
        }
        retired.extend(users.into_iter().map(|u| u.handle));

        let deadline = tokio::time::Instant::now() + self.graceful_stop;
        for mut handle in retired {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        peak
    }
}

fn spawn_user(scenario: Arc<Scenario>) -> VirtualUser {
    let stop = Arc::new(AtomicBool::new(false));
    let user_stop = stop.clone();
    let handle = tokio::spawn(async move {
        while !user_stop.load(Ordering::Relaxed) {
            scenario.run_iteration().await;
        }
    });
    VirtualUser { stop, handle }
}

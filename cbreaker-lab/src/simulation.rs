//! Drives a breaker against a dependency that degrades and recovers.
//!
//! ```text
//! workers (tokio tasks)
//!     → Breaker::call_async
//!     → FlakyDependency::request (latency, random failures, outage window)
//! ```

use anyhow::Result;
use cbreaker_core::{Breaker, BreakerBuilder, CircuitState, Transition};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, DependencyConfig};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("Dependency unavailable (outage)")]
    Outage,

    #[error("Transient failure on request {request}")]
    Transient { request: u64 },
}

/// Stand-in for a remote service.
pub struct FlakyDependency {
    started: Instant,
    latency: Duration,
    failure_rate: f64,
    outage: (Duration, Duration),
    requests: AtomicU64,
}

impl FlakyDependency {
    pub fn new(config: &DependencyConfig) -> Self {
        Self {
            started: Instant::now(),
            latency: config.latency(),
            failure_rate: config.failure_rate,
            outage: config.outage_window(),
            requests: AtomicU64::new(0),
        }
    }

    pub fn in_outage(&self) -> bool {
        let elapsed = self.started.elapsed();
        elapsed >= self.outage.0 && elapsed < self.outage.1
    }

    /// Requests that actually reached the dependency
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub async fn request(&self) -> Result<u64, DependencyError> {
        let request = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(self.latency).await;

        if self.in_outage() {
            return Err(DependencyError::Outage);
        }
        if rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(DependencyError::Transient { request });
        }
        Ok(request)
    }
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: AtomicU64,
    failed: AtomicU64,
    short_circuited: AtomicU64,
}

/// Outcome of one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub calls: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub short_circuited: u64,
    pub dependency_requests: u64,
    pub transitions: Vec<Transition>,
    pub final_state: CircuitState,
}

pub async fn run(config: &Config) -> Result<RunSummary> {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = transitions.clone();

    let breaker: Arc<Breaker<u64, DependencyError>> = Arc::new(
        BreakerBuilder::from_config(config.breaker.clone())
            .name(config.breaker_name.clone())
            .on_state_change(move |from, to| {
                let transition = Transition::new(from, to);
                info!(%transition, "State change");
                sink.lock().push(transition);
            })
            .try_build()?,
    );
    let dependency = Arc::new(FlakyDependency::new(&config.dependency));
    let tally = Arc::new(Tally::default());

    info!(
        workers = config.workers,
        calls_per_worker = config.calls_per_worker,
        "Starting simulation"
    );

    let mut handles = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        let breaker = breaker.clone();
        let dependency = dependency.clone();
        let tally = tally.clone();
        let calls = config.calls_per_worker;
        let interval = config.call_interval();

        handles.push(tokio::spawn(async move {
            for _ in 0..calls {
                let invoked = AtomicBool::new(false);
                let result = breaker
                    .call_async(|| {
                        invoked.store(true, Ordering::Relaxed);
                        dependency.request()
                    })
                    .await;

                match result {
                    Ok(_) => tally.succeeded.fetch_add(1, Ordering::Relaxed),
                    Err(_) if invoked.load(Ordering::Relaxed) => {
                        tally.failed.fetch_add(1, Ordering::Relaxed)
                    }
                    Err(_) => tally.short_circuited.fetch_add(1, Ordering::Relaxed),
                };
                tokio::time::sleep(interval).await;
            }
            debug!(worker, "Worker finished");
        }));
    }

    for handle in handles {
        handle.await?;
    }

    let succeeded = tally.succeeded.load(Ordering::Relaxed);
    let failed = tally.failed.load(Ordering::Relaxed);
    let short_circuited = tally.short_circuited.load(Ordering::Relaxed);
    let transitions = transitions.lock().clone();

    Ok(RunSummary {
        calls: succeeded + failed + short_circuited,
        succeeded,
        failed,
        short_circuited,
        dependency_requests: dependency.requests(),
        transitions,
        final_state: breaker.state(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbreaker_core::BreakerConfig;
    use pretty_assertions::assert_eq;

    fn config(dependency: DependencyConfig, breaker: BreakerConfig) -> Config {
        Config {
            workers: 4,
            calls_per_worker: 25,
            call_interval_ms: 1,
            breaker,
            dependency,
            ..Default::default()
        }
    }

    fn healthy() -> DependencyConfig {
        DependencyConfig {
            latency_ms: 0,
            failure_rate: 0.0,
            outage_start_ms: 3_600_000,
            outage_duration_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_dependency_fails_during_outage() {
        let dependency = FlakyDependency::new(&DependencyConfig {
            outage_start_ms: 0,
            outage_duration_ms: 3_600_000,
            ..healthy()
        });

        assert!(dependency.in_outage());
        assert_eq!(dependency.request().await, Err(DependencyError::Outage));
        assert_eq!(dependency.requests(), 1);
    }

    #[tokio::test]
    async fn test_healthy_dependency_never_trips() {
        let summary = run(&config(healthy(), BreakerConfig::default()))
            .await
            .unwrap();

        assert_eq!(summary.calls, 100);
        assert_eq!(summary.succeeded, 100);
        assert_eq!(summary.dependency_requests, 100);
        assert!(summary.transitions.is_empty());
        assert_eq!(summary.final_state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_permanent_outage_short_circuits() {
        let outage = DependencyConfig {
            outage_start_ms: 0,
            outage_duration_ms: 3_600_000,
            ..healthy()
        };
        let breaker = BreakerConfig {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(3600),
            retry_threshold: 1,
        };

        let summary = run(&config(outage, breaker)).await.unwrap();

        assert_eq!(summary.calls, 100);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.final_state, CircuitState::Open);
        assert_eq!(
            summary.transitions,
            vec![Transition::new(CircuitState::Closed, CircuitState::Open)]
        );
        assert_eq!(summary.failed, summary.dependency_requests);
        assert!(summary.short_circuited > 0);
    }

    #[tokio::test]
    async fn test_invalid_breaker_config_is_rejected() {
        let breaker = BreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };

        assert!(run(&config(healthy(), breaker)).await.is_err());
    }
}

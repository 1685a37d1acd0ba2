//! Health gating and check aggregation.
//!
//! The worker pool only polls while a shared health flag is up. The flag
//! starts down, is driven by a single supervisor task draining a feedback
//! channel, and a separate shutdown flag (set when the done signal fires)
//! makes every worker exit its poll loop on the next iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use concorda_core::HealthCheck;

/// Shared health and shutdown flags read by every worker.
#[derive(Default)]
pub struct SystemHealth {
    healthy: AtomicBool,
    shutdown: AtomicBool,
}

impl SystemHealth {
    /// Both flags start down; workers wait for the first healthy signal.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_good(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Flip the health flag directly. The supervisor normally owns this;
    /// tests use it to gate workers without a monitor.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

/// Spawn the single supervisor mutating the shared flags: health status from
/// the feedback channel, shutdown from the done signal.
pub fn spawn_supervisor(
    health: Arc<SystemHealth>,
    mut feedback: mpsc::Receiver<bool>,
    mut done: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                status = feedback.recv() => {
                    let Some(status) = status else {
                        return;
                    };
                    if status != health.is_good() {
                        warn!(healthy = status, "changing healthy status");
                        health.set_healthy(status);
                    }
                }
                _ = done.changed() => {
                    warn!("changing shutdown status to 'true'");
                    health.shutdown.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    })
}

/// Outcome of one named readiness probe.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Run every check in parallel and report each outcome.
pub async fn run_checks(checks: &[Arc<dyn HealthCheck>]) -> Vec<CheckResult> {
    join_all(checks.iter().map(|check| async move {
        match check.check().await {
            Ok(()) => CheckResult {
                name: check.name().to_string(),
                ok: true,
                message: String::new(),
            },
            Err(e) => CheckResult {
                name: check.name().to_string(),
                ok: false,
                message: e.to_string(),
            },
        }
    }))
    .await
}

/// Good-to-go: all checks pass in parallel, or the first failure message.
pub async fn gtg(checks: &[Arc<dyn HealthCheck>]) -> Result<(), String> {
    let results = run_checks(checks).await;
    match results.into_iter().find(|r| !r.ok) {
        Some(failed) => Err(failed.message),
        None => Ok(()),
    }
}

/// Periodically evaluate the checks and feed the aggregate status into the
/// supervisor's feedback channel until the done signal fires.
pub fn spawn_monitor(
    checks: Vec<Arc<dyn HealthCheck>>,
    interval: Duration,
    feedback: mpsc::Sender<bool>,
    mut done: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let healthy = gtg(&checks).await.is_ok();
            debug!(healthy, "health monitor tick");
            if feedback.send(healthy).await.is_err() {
                return;
            }
            tokio::select! {
                _ = done.changed() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concorda_core::{Error, Result};

    struct StaticCheck {
        name: &'static str,
        ok: bool,
    }

    #[async_trait]
    impl HealthCheck for StaticCheck {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> Result<()> {
            if self.ok {
                Ok(())
            } else {
                Err(Error::Request(format!("{} is down", self.name)))
            }
        }
    }

    fn check(name: &'static str, ok: bool) -> Arc<dyn HealthCheck> {
        Arc::new(StaticCheck { name, ok })
    }

    #[tokio::test]
    async fn test_gtg_ok_when_all_pass() {
        let checks = vec![check("a", true), check("b", true)];
        assert!(gtg(&checks).await.is_ok());
    }

    #[tokio::test]
    async fn test_gtg_reports_first_failure_message() {
        let checks = vec![check("a", true), check("b", false), check("c", false)];
        let msg = gtg(&checks).await.unwrap_err();
        assert!(msg.contains("b is down"));
    }

    #[tokio::test]
    async fn test_run_checks_reports_all() {
        let checks = vec![check("a", true), check("b", false)];
        let results = run_checks(&checks).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert!(!results[1].ok);
    }

    #[tokio::test]
    async fn test_supervisor_flips_health_and_shutdown() {
        let health = SystemHealth::new();
        let (feedback_tx, feedback_rx) = mpsc::channel(4);
        let (done_tx, done_rx) = watch::channel(false);
        let supervisor = spawn_supervisor(health.clone(), feedback_rx, done_rx);

        assert!(!health.is_good());
        feedback_tx.send(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(health.is_good());

        done_tx.send(true).unwrap();
        supervisor.await.unwrap();
        assert!(health.is_shutting_down());
    }
}

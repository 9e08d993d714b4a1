//! In-process periodic job runner.
//!
//! [`TokioJobRunner`] implements the [`JobRunner`] boundary for hosts that
//! have no OS-level job scheduler (desktop and daemon deployments, and this
//! crate's own tests). Each registered job is a spawned tokio task that
//! sleeps through its initial delay, then loops run/sleep until cancelled or
//! replaced.

use crate::error::Result;
use crate::scheduler::jobs::{JobBody, JobOutcome, JobRunner, PeriodicJobSpec};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tokio-backed [`JobRunner`] with replace-on-register semantics.
///
/// Registration must happen inside a tokio runtime. The declared constraint
/// set is accepted and ignored; an in-process runner has no environmental
/// scheduler to delegate to.
#[derive(Default)]
pub struct TokioJobRunner {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioJobRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered jobs.
    pub fn active_jobs(&self) -> usize {
        self.lock().len()
    }

    /// Abort every registered job.
    pub fn shutdown(&self) {
        let mut jobs = self.lock();
        for (name, handle) in jobs.drain() {
            debug!("aborting job '{name}'");
            handle.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobRunner for TokioJobRunner {
    fn register_periodic(&self, spec: PeriodicJobSpec, body: JobBody) -> Result<()> {
        let mut jobs = self.lock();

        if let Some(prior) = jobs.remove(&spec.name) {
            debug!("replacing registered job '{}'", spec.name);
            prior.abort();
        }

        if spec.constraints != Default::default() {
            debug!(
                "job '{}' declares constraints the in-process runner ignores",
                spec.name
            );
        }

        let name = spec.name.clone();
        let handle = tokio::spawn(run_job_loop(spec, body));
        jobs.insert(name.clone(), handle);
        info!("registered periodic job '{name}'");
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        if let Some(handle) = self.lock().remove(name) {
            handle.abort();
            info!("cancelled periodic job '{name}'");
        }
        Ok(())
    }
}

impl Drop for TokioJobRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_job_loop(spec: PeriodicJobSpec, body: JobBody) {
    tokio::time::sleep(spec.initial_delay).await;

    let mut consecutive_failures = 0u32;
    loop {
        let outcome = body();
        let delay = match outcome {
            JobOutcome::Ok => {
                consecutive_failures = 0;
                spec.period
            }
            JobOutcome::Failed => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                let delay = spec.backoff.delay_for(consecutive_failures).min(spec.period);
                warn!(
                    "job '{}' failed ({} consecutive), retrying in {}s",
                    spec.name,
                    consecutive_failures,
                    delay.as_secs()
                );
                delay
            }
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::scheduler::jobs::BackoffPolicy;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn counting_body(counter: Arc<AtomicU32>, outcome: JobOutcome) -> JobBody {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            outcome
        })
    }

    #[tokio::test(start_paused = true)]
    async fn job_runs_after_initial_delay_then_every_period() {
        let runner = TokioJobRunner::new();
        let runs = Arc::new(AtomicU32::new(0));
        let spec = PeriodicJobSpec::new("tick", Duration::from_secs(60))
            .with_initial_delay(Duration::from_secs(10));

        runner
            .register_periodic(spec, counting_body(runs.clone(), JobOutcome::Ok))
            .expect("register");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn registering_twice_leaves_one_active_job() {
        let runner = TokioJobRunner::new();
        let first_runs = Arc::new(AtomicU32::new(0));
        let second_runs = Arc::new(AtomicU32::new(0));
        let spec = PeriodicJobSpec::new("refresh", Duration::from_secs(60));

        runner
            .register_periodic(
                spec.clone(),
                counting_body(first_runs.clone(), JobOutcome::Ok),
            )
            .expect("first register");
        runner
            .register_periodic(spec, counting_body(second_runs.clone(), JobOutcome::Ok))
            .expect("second register");

        assert_eq!(runner.active_jobs(), 1);

        tokio::time::sleep(Duration::from_secs(130)).await;
        assert_eq!(first_runs.load(Ordering::SeqCst), 0);
        assert!(second_runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_runs_retry_with_linear_backoff() {
        let runner = TokioJobRunner::new();
        let runs = Arc::new(AtomicU32::new(0));
        let spec = PeriodicJobSpec::new("flaky", Duration::from_secs(3600)).with_backoff(
            BackoffPolicy::Linear {
                step: Duration::from_secs(60),
            },
        );

        runner
            .register_periodic(spec, counting_body(runs.clone(), JobOutcome::Failed))
            .expect("register");

        // First run immediately, retry after 60s, then after 120s more.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped_at_the_period() {
        let runner = TokioJobRunner::new();
        let runs = Arc::new(AtomicU32::new(0));
        let spec = PeriodicJobSpec::new("capped", Duration::from_secs(120)).with_backoff(
            BackoffPolicy::Linear {
                step: Duration::from_secs(3600),
            },
        );

        runner
            .register_periodic(spec, counting_body(runs.clone(), JobOutcome::Failed))
            .expect("register");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Backoff step exceeds the period, so the retry lands one period out.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_runs() {
        let runner = TokioJobRunner::new();
        let runs = Arc::new(AtomicU32::new(0));
        let spec = PeriodicJobSpec::new("doomed", Duration::from_secs(60));

        runner
            .register_periodic(spec, counting_body(runs.clone(), JobOutcome::Ok))
            .expect("register");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        runner.cancel("doomed").expect("cancel");
        assert_eq!(runner.active_jobs(), 0);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_unknown_name_is_ok() {
        let runner = TokioJobRunner::new();
        runner.cancel("never_registered").expect("cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_job_does_not_stop_a_healthy_sibling() {
        let runner = TokioJobRunner::new();
        let healthy_runs = Arc::new(AtomicU32::new(0));
        let failing_runs = Arc::new(AtomicU32::new(0));

        runner
            .register_periodic(
                PeriodicJobSpec::new("healthy", Duration::from_secs(60)),
                counting_body(healthy_runs.clone(), JobOutcome::Ok),
            )
            .expect("register healthy");
        runner
            .register_periodic(
                PeriodicJobSpec::new("failing", Duration::from_secs(60)),
                counting_body(failing_runs.clone(), JobOutcome::Failed),
            )
            .expect("register failing");

        tokio::time::sleep(Duration::from_secs(200)).await;

        assert!(healthy_runs.load(Ordering::SeqCst) >= 3);
        assert!(failing_runs.load(Ordering::SeqCst) >= 3);
    }
}

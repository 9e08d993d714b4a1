//! Periodic job definitions and the job-runner boundary.
//!
//! Defines [`PeriodicJobSpec`] (name, period, initial delay, retry backoff,
//! constraint set, replace-on-register policy) and the [`JobRunner`] trait
//! implemented by the hosting execution environment.

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one periodic job invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The invocation completed (possibly as a benign no-op).
    Ok,
    /// The invocation failed internally; the runner should retry per the
    /// job's backoff policy.
    Failed,
}

/// Retry policy applied between a failed run and the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Delay grows by a fixed step per consecutive failure.
    Linear {
        /// Step added per consecutive failure.
        step: Duration,
    },
}

impl BackoffPolicy {
    /// Delay before the next attempt after `consecutive_failures` failed
    /// runs in a row.
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        match self {
            Self::Linear { step } => step.saturating_mul(consecutive_failures),
        }
    }
}

/// Environmental requirements a job declares to the hosting runner.
///
/// The scheduling core requires none of them: correctness depends only on
/// wall-clock time, so its jobs must run regardless of device state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobConstraints {
    /// Requires an unmetered/any network connection.
    pub network_required: bool,
    /// Requires battery above the low threshold.
    pub battery_not_low: bool,
    /// Requires the device to be charging.
    pub charging_required: bool,
    /// Requires the device to be idle.
    pub device_idle: bool,
    /// Requires storage above the low threshold.
    pub storage_not_low: bool,
}

/// How a runner treats registration under an already-registered name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingJobPolicy {
    /// Atomically supersede the prior registration. Guarantees exactly one
    /// active timer per name no matter how often initialization runs.
    #[default]
    Replace,
}

/// Specification of one named recurring background job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicJobSpec {
    /// Unique job name; the replace policy keys on it.
    pub name: String,
    /// Recurrence period between successful runs.
    pub period: Duration,
    /// Delay before the first run.
    pub initial_delay: Duration,
    /// Retry policy after failed runs.
    pub backoff: BackoffPolicy,
    /// Declared environmental requirements.
    pub constraints: JobConstraints,
    /// Registration policy for an already-registered name.
    pub existing: ExistingJobPolicy,
}

impl PeriodicJobSpec {
    /// Create a spec with the given name and period, no initial delay, a
    /// one-minute linear backoff, and no constraints.
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            initial_delay: Duration::ZERO,
            backoff: BackoffPolicy::Linear {
                step: Duration::from_secs(60),
            },
            constraints: JobConstraints::default(),
            existing: ExistingJobPolicy::Replace,
        }
    }

    /// Set the delay before the first run.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the retry backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Callback executed on each job invocation.
pub type JobBody = Arc<dyn Fn() -> JobOutcome + Send + Sync>;

/// External OS-level (or in-process) recurring job runner.
pub trait JobRunner: Send + Sync {
    /// Register a recurring job. Registering an existing name follows the
    /// spec's [`ExistingJobPolicy`].
    fn register_periodic(&self, spec: PeriodicJobSpec, body: JobBody) -> Result<()>;

    /// Cancel the job registered under `name`, if any.
    fn cancel(&self, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn spec_defaults() {
        let spec = PeriodicJobSpec::new("refresh", Duration::from_secs(24 * 3600));
        assert_eq!(spec.name, "refresh");
        assert_eq!(spec.initial_delay, Duration::ZERO);
        assert_eq!(spec.constraints, JobConstraints::default());
        assert_eq!(spec.existing, ExistingJobPolicy::Replace);
    }

    #[test]
    fn builder_sets_delay_and_backoff() {
        let spec = PeriodicJobSpec::new("refresh", Duration::from_secs(3600))
            .with_initial_delay(Duration::from_secs(1800))
            .with_backoff(BackoffPolicy::Linear {
                step: Duration::from_secs(3600),
            });

        assert_eq!(spec.initial_delay, Duration::from_secs(1800));
        assert_eq!(
            spec.backoff,
            BackoffPolicy::Linear {
                step: Duration::from_secs(3600)
            }
        );
    }

    #[test]
    fn linear_backoff_grows_per_failure() {
        let backoff = BackoffPolicy::Linear {
            step: Duration::from_secs(3600),
        };
        assert_eq!(backoff.delay_for(0), Duration::ZERO);
        assert_eq!(backoff.delay_for(1), Duration::from_secs(3600));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(3 * 3600));
    }

    #[test]
    fn default_constraints_require_nothing() {
        let constraints = JobConstraints::default();
        assert!(!constraints.network_required);
        assert!(!constraints.battery_not_low);
        assert!(!constraints.charging_required);
        assert!(!constraints.device_idle);
        assert!(!constraints.storage_not_low);
    }
}

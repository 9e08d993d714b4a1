//! Periodic notification rescheduling.
//!
//! [`Rescheduler`] owns the two recurring background jobs that keep device
//! alerts accurate across app restarts, process death, and date rollover.
//! Each job invocation re-executes the full scheduling path from persisted
//! configuration; nothing depends on in-memory state from a prior run.

use crate::cache::PrayerTimeCache;
use crate::config::SettingsRepository;
use crate::method;
use crate::notify::NotificationScheduler;
use crate::scheduler::jobs::{BackoffPolicy, JobOutcome, JobRunner, PeriodicJobSpec};
use crate::times::PrayerCalculator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Name of the daily prayer-notification refresh job.
pub const PRAYER_JOB_NAME: &str = "reschedule_notifications";

/// Name of the reminder refresh job.
pub const REMINDER_JOB_NAME: &str = "reschedule_reminder";

/// Days of prayer-time entries kept warm ahead of today.
const PREFETCH_DAYS: u32 = 7;

/// Registers and runs the recurring refresh jobs.
///
/// Cheap to clone; all collaborators are shared. Both periodic jobs and
/// [`force_reschedule_now`](Self::force_reschedule_now) run the same bodies,
/// which are idempotent: two runs in quick succession converge to the same
/// set of registrations.
#[derive(Clone)]
pub struct Rescheduler {
    settings: SettingsRepository,
    cache: PrayerTimeCache,
    engine: Arc<dyn PrayerCalculator>,
    notifier: NotificationScheduler,
    runner: Arc<dyn JobRunner>,
}

impl Rescheduler {
    /// Create a rescheduler over its collaborators.
    pub fn new(
        settings: SettingsRepository,
        cache: PrayerTimeCache,
        engine: Arc<dyn PrayerCalculator>,
        notifier: NotificationScheduler,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            settings,
            cache,
            engine,
            notifier,
            runner,
        }
    }

    /// Register the two periodic refresh jobs.
    ///
    /// Idempotent: both jobs register with replace policy, so repeated
    /// initialization (every app startup) leaves exactly one active timer
    /// per name. Neither job declares environmental constraints; correctness
    /// depends only on wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns an error when the job runner rejects a registration.
    pub fn initialize(&self) -> crate::Result<()> {
        let hour = Duration::from_secs(3600);

        let prayer_spec = PeriodicJobSpec::new(PRAYER_JOB_NAME, Duration::from_secs(24 * 3600))
            .with_initial_delay(hour)
            .with_backoff(BackoffPolicy::Linear { step: hour });
        let this = self.clone();
        self.runner
            .register_periodic(prayer_spec, Arc::new(move || this.run_prayer_refresh_job()))?;

        let reminder_spec = PeriodicJobSpec::new(REMINDER_JOB_NAME, Duration::from_secs(12 * 3600))
            .with_initial_delay(Duration::from_secs(30 * 60))
            .with_backoff(BackoffPolicy::Linear { step: hour });
        let this = self.clone();
        self.runner.register_periodic(
            reminder_spec,
            Arc::new(move || this.run_reminder_refresh_job()),
        )?;

        info!("periodic reschedule jobs registered");
        Ok(())
    }

    /// One invocation of the prayer-notification refresh job.
    ///
    /// Every fault inside the body is caught here and reported as a failed
    /// run; it never propagates into the hosting execution context or blocks
    /// the next scheduled invocation.
    pub fn run_prayer_refresh_job(&self) -> JobOutcome {
        match self.refresh_prayer_notifications() {
            Ok(()) => JobOutcome::Ok,
            Err(e) => {
                error!("prayer refresh job failed: {e}");
                JobOutcome::Failed
            }
        }
    }

    /// One invocation of the reminder refresh job.
    pub fn run_reminder_refresh_job(&self) -> JobOutcome {
        let reminder = self.settings.load_reminder();
        self.notifier.schedule_reminder(&reminder);
        JobOutcome::Ok
    }

    /// Cancel both periodic jobs and every alert registration.
    pub fn cancel_all(&self) {
        if let Err(e) = self.runner.cancel(PRAYER_JOB_NAME) {
            error!("cannot cancel {PRAYER_JOB_NAME}: {e}");
        }
        if let Err(e) = self.runner.cancel(REMINDER_JOB_NAME) {
            error!("cannot cancel {REMINDER_JOB_NAME}: {e}");
        }
        self.notifier.cancel_all();
    }

    /// Run both job bodies synchronously, independent of the periodic
    /// timers. Used right after a settings change.
    pub fn force_reschedule_now(&self) {
        let prayer = self.run_prayer_refresh_job();
        let reminder = self.run_reminder_refresh_job();
        info!("forced reschedule: prayer={prayer:?} reminder={reminder:?}");
    }

    fn refresh_prayer_notifications(&self) -> crate::Result<()> {
        let Some(settings) = self.settings.load_settings() else {
            info!("no persisted settings yet, nothing to schedule");
            return Ok(());
        };
        let Some(coordinates) = settings.coordinates() else {
            info!("no stored location yet, skipping prayer scheduling");
            return Ok(());
        };

        let method_id = settings.calculation_method.as_deref();
        let school_id = settings.school.as_deref();
        let parameters = method::resolve(method_id, school_id);
        let today = chrono::Utc::now().date_naive();

        let times = match self.cache.get(today, coordinates, method_id, school_id) {
            Some(times) => times,
            None => {
                let times = self.engine.compute(today, coordinates, &parameters)?;
                self.cache
                    .put(today, coordinates, method_id, school_id, &times);
                times
            }
        };

        self.notifier.schedule_daily(&settings, &times);

        // Keep the upcoming week warm so date rollover never waits on the
        // engine. Per-day failures are logged inside prefetch.
        self.cache.prefetch(
            today,
            PREFETCH_DAYS,
            coordinates,
            method_id,
            school_id,
            |date| self.engine.compute(date, coordinates, &parameters),
        );

        Ok(())
    }
}

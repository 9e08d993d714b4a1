//! Composition roots.
//!
//! Two explicit wiring paths instead of ambient service lookup:
//! [`BackgroundGraph`] is the narrow graph an OS-level job runner re-enters
//! with (store, cache, scheduler, rescheduler, nothing UI-bound), and
//! [`ForegroundGraph`] wraps it with the settings-mutation path the host
//! application uses. Collaborators are injected at construction so tests can
//! wire fakes.

use crate::cache::PrayerTimeCache;
use crate::config::{AppSettings, ReminderSettings, SettingsRepository};
use crate::error::Result;
use crate::notify::{AlertSink, NotificationScheduler};
use crate::scheduler::jobs::JobRunner;
use crate::scheduler::rescheduler::Rescheduler;
use crate::store::KeyValueStore;
use crate::times::PrayerCalculator;
use std::sync::Arc;
use tracing::info;

/// Initialize tracing diagnostics with an env-filter.
///
/// Idempotent; safe to call from both composition roots and from a
/// background re-entry where the foreground may already have installed a
/// subscriber.
pub fn init_diagnostics() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// The background-capable service graph.
///
/// Everything a job-runner re-entry needs, and nothing more.
#[derive(Clone)]
pub struct BackgroundGraph {
    /// Settings snapshot reader/writer.
    pub settings: SettingsRepository,
    /// TTL-bounded prayer-time cache.
    pub cache: PrayerTimeCache,
    /// Alert registration path.
    pub notifier: NotificationScheduler,
    /// Periodic job owner.
    pub rescheduler: Rescheduler,
}

impl BackgroundGraph {
    /// Wire the background graph from its four external collaborators.
    pub fn wire(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn PrayerCalculator>,
        alerts: Arc<dyn AlertSink>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        let settings = SettingsRepository::new(store.clone());
        let cache = PrayerTimeCache::new(store);
        let notifier = NotificationScheduler::new(alerts);
        let rescheduler = Rescheduler::new(
            settings.clone(),
            cache.clone(),
            engine,
            notifier.clone(),
            runner,
        );

        Self {
            settings,
            cache,
            notifier,
            rescheduler,
        }
    }
}

/// Foreground service graph: the background graph plus the settings-mutation
/// path.
#[derive(Clone)]
pub struct ForegroundGraph {
    /// The shared background graph.
    pub background: BackgroundGraph,
}

impl ForegroundGraph {
    /// Wire the foreground graph from the same four collaborators.
    pub fn wire(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn PrayerCalculator>,
        alerts: Arc<dyn AlertSink>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self {
            background: BackgroundGraph::wire(store, engine, alerts, runner),
        }
    }

    /// Persist a new settings snapshot and immediately re-derive every
    /// registration from it.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be persisted; the forced
    /// reschedule itself never fails (job bodies contain their own faults).
    pub fn apply_settings(&self, settings: &AppSettings) -> Result<()> {
        self.background.settings.save_settings(settings)?;
        info!("settings changed, forcing reschedule");
        self.background.rescheduler.force_reschedule_now();
        Ok(())
    }

    /// Persist a new reminder configuration and immediately re-register it.
    ///
    /// # Errors
    ///
    /// Returns an error when the reminder keys cannot be persisted.
    pub fn apply_reminder(&self, reminder: &ReminderSettings) -> Result<()> {
        self.background.settings.save_reminder(reminder)?;
        info!("reminder changed, forcing reschedule");
        self.background.rescheduler.force_reschedule_now();
        Ok(())
    }
}

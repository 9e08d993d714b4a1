//! One-shot alert registration for prayer slots and the dhikr reminder.
//!
//! [`NotificationScheduler`] derives fire instants from a day's computed
//! entry plus the per-slot preferences, and (re)registers alerts through the
//! external [`AlertSink`]. Registration is always a full cycle: cancel every
//! slot id, then register only the enabled, still-upcoming ones, so no stale
//! alert survives a configuration change.

use crate::config::{AppSettings, ReminderSettings};
use crate::error::Result;
use crate::times::{DayTimes, PrayerSlot};
use chrono::{DateTime, Days, Duration, Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed alert id for the recurring dhikr reminder.
pub const REMINDER_ALERT_ID: u32 = 9876;

/// External one-shot alert mechanism.
///
/// Registering an id that is already active replaces the prior registration;
/// implementations must never duplicate.
pub trait AlertSink: Send + Sync {
    /// Register a one-shot alert, superseding any active alert with `id`.
    fn schedule_one_shot(
        &self,
        id: u32,
        title: &str,
        body: &str,
        fire_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Cancel the active alert with `id`, if any.
    fn cancel(&self, id: u32) -> Result<()>;
}

/// Schedules prayer-slot and reminder alerts from a configuration snapshot.
#[derive(Clone)]
pub struct NotificationScheduler {
    alerts: Arc<dyn AlertSink>,
}

impl NotificationScheduler {
    /// Create a scheduler over the given alert sink.
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        Self { alerts }
    }

    /// Run a full reschedule cycle for today's five prayer slots.
    pub fn schedule_daily(&self, settings: &AppSettings, times: &DayTimes) {
        self.schedule_daily_at(settings, times, Utc::now());
    }

    /// [`schedule_daily`](Self::schedule_daily) with an explicit current
    /// instant.
    ///
    /// Cancels all five slot ids unconditionally, then registers each enabled
    /// slot whose offset-adjusted fire time is strictly after `now`. Slots
    /// whose raw time is absent (extreme latitudes) are skipped. Sink
    /// failures are caught per slot and never abort the remaining slots.
    pub fn schedule_daily_at(
        &self,
        settings: &AppSettings,
        times: &DayTimes,
        now: DateTime<Utc>,
    ) {
        self.cancel_prayer_alerts();

        for slot in PrayerSlot::ALL {
            let preference = settings.slot(slot);
            if !preference.enabled {
                continue;
            }

            let Some(raw) = times.time_for(slot) else {
                debug!("no computed time for {slot}, skipping");
                continue;
            };

            let fire_at = raw + Duration::minutes(preference.offset_minutes);
            if fire_at <= now {
                debug!("{slot} fire time {fire_at} already passed, skipping");
                continue;
            }

            let title = format!("{slot} Prayer");
            let body = format!("It is time for the {} prayer.", slot.display_name().to_lowercase());
            if let Err(e) = self
                .alerts
                .schedule_one_shot(slot.alert_id(), &title, &body, fire_at)
            {
                warn!("cannot register {slot} alert: {e}");
            }
        }
    }

    /// Register (or clear) the recurring dhikr reminder.
    pub fn schedule_reminder(&self, reminder: &ReminderSettings) {
        self.schedule_reminder_at(reminder, Utc::now());
    }

    /// [`schedule_reminder`](Self::schedule_reminder) with an explicit
    /// current instant.
    ///
    /// The reminder id is cancelled first so a disable takes effect
    /// immediately. When enabled, the fire time is today at the configured
    /// hour and minute; if that instant has passed it rolls forward exactly
    /// one day.
    pub fn schedule_reminder_at(&self, reminder: &ReminderSettings, now: DateTime<Utc>) {
        if let Err(e) = self.alerts.cancel(REMINDER_ALERT_ID) {
            warn!("cannot cancel reminder alert: {e}");
        }

        if !reminder.enabled {
            return;
        }

        let Some(today_at) = now
            .with_hour(u32::from(reminder.hour))
            .and_then(|t| t.with_minute(u32::from(reminder.minute)))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
        else {
            warn!(
                "invalid reminder time {:02}:{:02}, skipping",
                reminder.hour, reminder.minute
            );
            return;
        };

        let fire_at = if today_at <= now {
            match today_at.checked_add_days(Days::new(1)) {
                Some(t) => t,
                None => {
                    warn!("reminder fire time overflow, skipping");
                    return;
                }
            }
        } else {
            today_at
        };

        if let Err(e) = self.alerts.schedule_one_shot(
            REMINDER_ALERT_ID,
            "Dhikr Reminder",
            "Time for tesbih.",
            fire_at,
        ) {
            warn!("cannot register reminder alert: {e}");
        }
    }

    /// Cancel all five prayer-slot alerts, tolerating per-slot failures.
    pub fn cancel_prayer_alerts(&self) {
        for slot in PrayerSlot::ALL {
            if let Err(e) = self.alerts.cancel(slot.alert_id()) {
                warn!("cannot cancel {slot} alert: {e}");
            }
        }
    }

    /// Cancel every registration this scheduler manages (slots + reminder).
    pub fn cancel_all(&self) {
        self.cancel_prayer_alerts();
        if let Err(e) = self.alerts.cancel(REMINDER_ALERT_ID) {
            warn!("cannot cancel reminder alert: {e}");
        }
    }
}

//! Configuration snapshots and their persistence.
//!
//! [`AppSettings`] is the read-only snapshot this core schedules from; it is
//! owned by the settings subsystem and persisted under the `app_settings`
//! store key as a JSON string. The dhikr reminder keeps its three dedicated
//! store keys. [`SettingsRepository`] is the only reader/writer of either.

use crate::error::{Result, VakitError};
use crate::store::{KeyValueStore, StoreValue};
use crate::times::{Coordinates, PrayerSlot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Store key for the serialized [`AppSettings`] snapshot.
pub const SETTINGS_KEY: &str = "app_settings";

/// Store key for the reminder hour.
pub const REMINDER_HOUR_KEY: &str = "tesbih_reminder_hour";

/// Store key for the reminder minute.
pub const REMINDER_MINUTE_KEY: &str = "tesbih_reminder_minute";

/// Store key for the reminder enabled flag.
pub const REMINDER_ENABLED_KEY: &str = "tesbih_reminder_enabled";

/// Per-slot notification preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotPreference {
    /// Whether a notification is scheduled for this slot.
    pub enabled: bool,
    /// Signed minute adjustment applied to the raw computed instant.
    pub offset_minutes: i64,
}

impl Default for SlotPreference {
    fn default() -> Self {
        Self {
            enabled: true,
            offset_minutes: 0,
        }
    }
}

/// User-facing scheduling configuration, read-only to this core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Calculation-method identifier (`None` = engine default).
    pub calculation_method: Option<String>,
    /// Jurisprudence-school identifier (`None` = standard).
    pub school: Option<String>,
    /// Last known latitude, stored by the settings subsystem when the host
    /// app acquires a location.
    pub latitude: Option<f64>,
    /// Last known longitude.
    pub longitude: Option<f64>,
    /// Dawn prayer notification preference.
    pub dawn: SlotPreference,
    /// Midday prayer notification preference.
    pub midday: SlotPreference,
    /// Afternoon prayer notification preference.
    pub afternoon: SlotPreference,
    /// Sunset prayer notification preference.
    pub sunset: SlotPreference,
    /// Night prayer notification preference.
    pub night: SlotPreference,
}

impl AppSettings {
    /// Notification preference for a slot.
    pub fn slot(&self, slot: PrayerSlot) -> SlotPreference {
        match slot {
            PrayerSlot::Dawn => self.dawn,
            PrayerSlot::Midday => self.midday,
            PrayerSlot::Afternoon => self.afternoon,
            PrayerSlot::Sunset => self.sunset,
            PrayerSlot::Night => self.night,
        }
    }

    /// Mutable notification preference for a slot.
    pub fn slot_mut(&mut self, slot: PrayerSlot) -> &mut SlotPreference {
        match slot {
            PrayerSlot::Dawn => &mut self.dawn,
            PrayerSlot::Midday => &mut self.midday,
            PrayerSlot::Afternoon => &mut self.afternoon,
            PrayerSlot::Sunset => &mut self.sunset,
            PrayerSlot::Night => &mut self.night,
        }
    }

    /// The stored location, when both components are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// Recurring dhikr reminder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// Whether the reminder is scheduled at all.
    pub enabled: bool,
    /// Hour of day (0-23, UTC).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub minute: u8,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 21,
            minute: 0,
        }
    }
}

/// Reads and writes configuration snapshots through the key-value store.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    /// Create a repository over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted settings snapshot.
    ///
    /// Returns `None` when no snapshot has been persisted yet. A store
    /// failure or an unparseable snapshot also yields `None` with a
    /// diagnostic; configuration absence is always benign to callers.
    pub fn load_settings(&self) -> Option<AppSettings> {
        let value = match self.store.get(SETTINGS_KEY) {
            Ok(v) => v,
            Err(e) => {
                warn!("cannot read settings snapshot: {e}");
                return None;
            }
        };

        let json = match value {
            Some(StoreValue::Str(json)) => json,
            Some(other) => {
                warn!("settings snapshot has unexpected shape: {other:?}");
                return None;
            }
            None => return None,
        };

        match serde_json::from_str(&json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("cannot parse settings snapshot: {e}");
                None
            }
        }
    }

    /// Persist a settings snapshot, overwriting any prior one.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the store write fails.
    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)
            .map_err(|e| VakitError::Settings(format!("cannot serialize settings: {e}")))?;
        self.store.save(SETTINGS_KEY, StoreValue::Str(json))?;
        debug!("settings snapshot saved");
        Ok(())
    }

    /// Load the reminder configuration from its dedicated keys.
    ///
    /// Missing or malformed keys fall back to field defaults; a partially
    /// written reminder never blocks scheduling.
    pub fn load_reminder(&self) -> ReminderSettings {
        let defaults = ReminderSettings::default();

        let read_int = |key: &str| match self.store.get(key) {
            Ok(Some(StoreValue::Int(i))) => Some(i),
            Ok(_) => None,
            Err(e) => {
                warn!("cannot read {key}: {e}");
                None
            }
        };

        let enabled = match self.store.get(REMINDER_ENABLED_KEY) {
            Ok(Some(StoreValue::Bool(b))) => b,
            Ok(_) => defaults.enabled,
            Err(e) => {
                warn!("cannot read {REMINDER_ENABLED_KEY}: {e}");
                defaults.enabled
            }
        };

        let hour = read_int(REMINDER_HOUR_KEY)
            .and_then(|i| u8::try_from(i).ok())
            .filter(|h| *h < 24)
            .unwrap_or(defaults.hour);
        let minute = read_int(REMINDER_MINUTE_KEY)
            .and_then(|i| u8::try_from(i).ok())
            .filter(|m| *m < 60)
            .unwrap_or(defaults.minute);

        ReminderSettings {
            enabled,
            hour,
            minute,
        }
    }

    /// Persist the reminder configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when any of the three key writes fails.
    pub fn save_reminder(&self, reminder: &ReminderSettings) -> Result<()> {
        self.store
            .save(REMINDER_HOUR_KEY, StoreValue::Int(i64::from(reminder.hour)))?;
        self.store.save(
            REMINDER_MINUTE_KEY,
            StoreValue::Int(i64::from(reminder.minute)),
        )?;
        self.store
            .save(REMINDER_ENABLED_KEY, StoreValue::Bool(reminder.enabled))?;
        debug!("reminder settings saved");
        Ok(())
    }
}

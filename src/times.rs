//! Prayer-time entry types and the calculation engine boundary.
//!
//! Defines the [`DayTimes`] entry (six optional UTC instants for one day at
//! one location), the five notification [`PrayerSlot`]s, and the
//! [`PrayerCalculator`] trait implemented by the external astronomical
//! engine.

use crate::error::Result;
use crate::method::CalculationParameters;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position used for prayer-time calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One of the five daily prayer notification slots.
///
/// Sunrise is part of the computed entry but is never a notification slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerSlot {
    /// Dawn prayer (fajr).
    Dawn,
    /// Midday prayer (dhuhr).
    Midday,
    /// Afternoon prayer (asr).
    Afternoon,
    /// Sunset prayer (maghrib).
    Sunset,
    /// Night prayer (isha).
    Night,
}

impl PrayerSlot {
    /// All five slots in chronological order.
    pub const ALL: [Self; 5] = [
        Self::Dawn,
        Self::Midday,
        Self::Afternoon,
        Self::Sunset,
        Self::Night,
    ];

    /// Fixed alert id for this slot.
    pub fn alert_id(self) -> u32 {
        match self {
            Self::Dawn => 0,
            Self::Midday => 1,
            Self::Afternoon => 2,
            Self::Sunset => 3,
            Self::Night => 4,
        }
    }

    /// Human-readable slot name used in alert titles.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Dawn => "Dawn",
            Self::Midday => "Midday",
            Self::Afternoon => "Afternoon",
            Self::Sunset => "Sunset",
            Self::Night => "Night",
        }
    }
}

impl std::fmt::Display for PrayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Computed prayer instants for one day at one location.
///
/// Each field may be absent when the engine cannot produce it (extreme
/// latitudes). Instants serialize as ISO-8601 timestamps; absence is an
/// explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayTimes {
    /// Dawn prayer instant (fajr).
    pub dawn: Option<DateTime<Utc>>,
    /// Sunrise instant. Informational only; never scheduled.
    pub sunrise: Option<DateTime<Utc>>,
    /// Midday prayer instant (dhuhr).
    pub midday: Option<DateTime<Utc>>,
    /// Afternoon prayer instant (asr).
    pub afternoon: Option<DateTime<Utc>>,
    /// Sunset prayer instant (maghrib).
    pub sunset: Option<DateTime<Utc>>,
    /// Night prayer instant (isha).
    pub night: Option<DateTime<Utc>>,
}

impl DayTimes {
    /// Raw computed instant for a notification slot, if the engine produced
    /// one.
    pub fn time_for(&self, slot: PrayerSlot) -> Option<DateTime<Utc>> {
        match slot {
            PrayerSlot::Dawn => self.dawn,
            PrayerSlot::Midday => self.midday,
            PrayerSlot::Afternoon => self.afternoon,
            PrayerSlot::Sunset => self.sunset,
            PrayerSlot::Night => self.night,
        }
    }
}

/// External astronomical calculation engine.
///
/// A pure function of date, position, and calculation parameters. The core
/// treats it as a bounded, fail-fast collaborator and never retries inline;
/// a failed computation surfaces at the next periodic cycle.
pub trait PrayerCalculator: Send + Sync {
    /// Compute the prayer instants for `date` at `coordinates`.
    fn compute(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
        parameters: &CalculationParameters,
    ) -> Result<DayTimes>;
}

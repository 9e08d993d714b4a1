//! Vakit: prayer-time notification scheduling and caching engine.
//!
//! Background subsystem keeping daily prayer notifications and a recurring
//! dhikr reminder accurate across app restarts, OS process death, and date
//! rollover.
//!
//! # Architecture
//!
//! Persisted configuration flows through a chain of small components:
//! - **Resolver**: maps method/school identifiers to calculation parameters
//!   with deterministic fallback
//! - **Cache**: TTL-bounded (date, location, method, school) → prayer-time
//!   entries, write-through over the key-value store
//! - **Notification scheduler**: derives fire instants (raw time ± offset),
//!   filters past times, registers one-shot alerts with replace semantics
//! - **Periodic rescheduler**: two independent recurring jobs re-running the
//!   whole derivation from persisted state, each inside its own failure
//!   boundary
//!
//! External collaborators (calculation engine, alert mechanism, key-value
//! store, job runner) are traits injected at construction; `startup` holds
//! the two composition roots (foreground and background re-entry).

pub mod cache;
pub mod config;
pub mod error;
pub mod method;
pub mod notify;
pub mod scheduler;
pub mod startup;
pub mod store;
pub mod test_utils;
pub mod times;

pub use cache::PrayerTimeCache;
pub use config::{AppSettings, ReminderSettings, SettingsRepository};
pub use error::{Result, VakitError};
pub use method::{CalculationParameters, School, resolve};
pub use notify::{AlertSink, NotificationScheduler};
pub use scheduler::{JobOutcome, JobRunner, PeriodicJobSpec, Rescheduler, TokioJobRunner};
pub use startup::{BackgroundGraph, ForegroundGraph};
pub use store::{JsonFileStore, KeyValueStore, StoreValue};
pub use times::{Coordinates, DayTimes, PrayerCalculator, PrayerSlot};

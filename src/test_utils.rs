//! Fake collaborators for isolated testing.
//!
//! In-memory stand-ins for the four external boundaries (store, calculation
//! engine, alert sink, job runner), shared by the unit tests and the
//! integration tests in `tests/`. Not intended for production use.

use crate::error::{Result, VakitError};
use crate::method::CalculationParameters;
use crate::scheduler::jobs::{JobBody, JobOutcome, JobRunner, PeriodicJobSpec};
use crate::store::{KeyValueStore, StoreValue};
use crate::times::{Coordinates, DayTimes, PrayerCalculator};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-memory [`KeyValueStore`] with switchable failure injection.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, StoreValue>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write/remove fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn save(&self, key: &str, value: StoreValue) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VakitError::Store("injected write failure".to_owned()));
        }
        lock(&self.entries).insert(key.to_owned(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(VakitError::Store("injected read failure".to_owned()));
        }
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VakitError::Store("injected write failure".to_owned()));
        }
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(VakitError::Store("injected read failure".to_owned()));
        }
        Ok(lock(&self.entries)
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// [`PrayerCalculator`] returning the same shape of day for every date.
pub struct FixedCalculator {
    base_offset: Duration,
    calls: AtomicU32,
    fail: AtomicBool,
}

impl FixedCalculator {
    /// Engine whose six instants all land `offset` after the call time.
    pub fn offset_from_now(offset: Duration) -> Self {
        Self {
            base_offset: offset,
            calls: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Number of `compute` invocations so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent computation fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PrayerCalculator for FixedCalculator {
    fn compute(
        &self,
        _date: NaiveDate,
        _coordinates: Coordinates,
        _parameters: &CalculationParameters,
    ) -> Result<DayTimes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VakitError::Engine("injected engine failure".to_owned()));
        }

        let base = Utc::now() + self.base_offset;
        Ok(DayTimes {
            dawn: Some(base),
            sunrise: Some(base + Duration::minutes(75)),
            midday: Some(base + Duration::minutes(400)),
            afternoon: Some(base + Duration::minutes(600)),
            sunset: Some(base + Duration::minutes(760)),
            night: Some(base + Duration::minutes(850)),
        })
    }
}

/// One registration held by [`RecordingAlerts`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// Alert id.
    pub id: u32,
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
    /// Fire instant.
    pub fire_at: DateTime<Utc>,
}

/// [`AlertSink`](crate::notify::AlertSink) that records registrations with
/// replace semantics and optional per-id failure injection.
#[derive(Default)]
pub struct RecordingAlerts {
    active: Mutex<HashMap<u32, AlertRecord>>,
    failing_ids: Mutex<HashSet<u32>>,
}

impl RecordingAlerts {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registrations for `id` fail.
    pub fn fail_id(&self, id: u32) {
        lock(&self.failing_ids).insert(id);
    }

    /// Sorted ids of currently active registrations.
    pub fn active_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = lock(&self.active).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of currently active registrations.
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }

    /// Fire instant of the active registration for `id`, if any.
    pub fn fire_time(&self, id: u32) -> Option<DateTime<Utc>> {
        lock(&self.active).get(&id).map(|r| r.fire_at)
    }

    /// Full record of the active registration for `id`, if any.
    pub fn record(&self, id: u32) -> Option<AlertRecord> {
        lock(&self.active).get(&id).cloned()
    }
}

impl crate::notify::AlertSink for RecordingAlerts {
    fn schedule_one_shot(
        &self,
        id: u32,
        title: &str,
        body: &str,
        fire_at: DateTime<Utc>,
    ) -> Result<()> {
        if lock(&self.failing_ids).contains(&id) {
            return Err(VakitError::Alert(format!(
                "injected registration failure for id {id}"
            )));
        }
        lock(&self.active).insert(
            id,
            AlertRecord {
                id,
                title: title.to_owned(),
                body: body.to_owned(),
                fire_at,
            },
        );
        Ok(())
    }

    fn cancel(&self, id: u32) -> Result<()> {
        lock(&self.active).remove(&id);
        Ok(())
    }
}

/// [`JobRunner`] that holds registrations for manual firing.
///
/// Mirrors an OS-level runner: replace-on-register, and jobs execute only
/// when the test invokes [`fire`](Self::fire).
#[derive(Default)]
pub struct ManualJobRunner {
    jobs: Mutex<HashMap<String, (PeriodicJobSpec, JobBody)>>,
    registrations: Mutex<HashMap<String, u32>>,
}

impl ManualJobRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered jobs.
    pub fn active_count(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// How many times `name` has been registered in total.
    pub fn registration_count(&self, name: &str) -> u32 {
        lock(&self.registrations).get(name).copied().unwrap_or(0)
    }

    /// Spec of the registered job `name`, if any.
    pub fn spec(&self, name: &str) -> Option<PeriodicJobSpec> {
        lock(&self.jobs).get(name).map(|(spec, _)| spec.clone())
    }

    /// Run the registered job `name` once, returning its outcome.
    pub fn fire(&self, name: &str) -> Option<JobOutcome> {
        let body = lock(&self.jobs).get(name).map(|(_, body)| body.clone())?;
        Some(body())
    }
}

impl JobRunner for ManualJobRunner {
    fn register_periodic(&self, spec: PeriodicJobSpec, body: JobBody) -> Result<()> {
        *lock(&self.registrations)
            .entry(spec.name.clone())
            .or_insert(0) += 1;
        lock(&self.jobs).insert(spec.name.clone(), (spec, body));
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        lock(&self.jobs).remove(name);
        Ok(())
    }
}

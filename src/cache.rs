//! TTL-bounded prayer-time cache.
//!
//! Write-through cache over the key-value store, mapping
//! (date, location, method, school) to a serialized [`DayTimes`] entry with
//! an explicit expiration record. Storage failures always degrade: reads
//! become misses and writes become logged no-ops, so scheduling correctness
//! never depends on cache availability.

use crate::store::{KeyValueStore, StoreValue};
use crate::times::{Coordinates, DayTimes};
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix shared by every cache record key.
pub const CACHE_KEY_PREFIX: &str = "prayer_times_";

/// Suffix of the paired expiration record.
const EXPIRATION_SUFFIX: &str = "_expiration";

/// Retention window for cached entries.
pub const RETENTION_DAYS: i64 = 30;

/// Build the store key for one cached entry.
///
/// Deterministic and collision-free: the date is ISO `YYYY-MM-DD`, each
/// coordinate is formatted to exactly 4 decimal places, and absent method or
/// school identifiers use the literal token `default`.
pub fn cache_key(
    date: NaiveDate,
    coordinates: Coordinates,
    method: Option<&str>,
    school: Option<&str>,
) -> String {
    format!(
        "{CACHE_KEY_PREFIX}{}_{:.4}_{:.4}_{}_{}",
        date.format("%Y-%m-%d"),
        coordinates.latitude,
        coordinates.longitude,
        method.unwrap_or("default"),
        school.unwrap_or("default"),
    )
}

/// TTL-bounded cache of computed prayer-time entries.
#[derive(Clone)]
pub struct PrayerTimeCache {
    store: Arc<dyn KeyValueStore>,
}

impl PrayerTimeCache {
    /// Create a cache over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Look up the entry for the given key components at the current time.
    pub fn get(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
        method: Option<&str>,
        school: Option<&str>,
    ) -> Option<DayTimes> {
        self.get_at(date, coordinates, method, school, Utc::now())
    }

    /// Look up an entry, evaluating expiration against `now`.
    ///
    /// An entry is live for any read at or before its expiration instant. An
    /// absent, malformed, or passed expiration record is a miss, and both
    /// records are purged on the access that detects it.
    pub fn get_at(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
        method: Option<&str>,
        school: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<DayTimes> {
        let key = cache_key(date, coordinates, method, school);
        let expiration_key = format!("{key}{EXPIRATION_SUFFIX}");

        let expires_at_ms = match self.store.get(&expiration_key) {
            Ok(Some(StoreValue::Int(ms))) => Some(ms),
            Ok(_) => None,
            Err(e) => {
                warn!("cache read failed for {expiration_key}: {e}");
                return None;
            }
        };

        let live = expires_at_ms.is_some_and(|ms| ms >= now.timestamp_millis());
        if !live {
            self.purge(&key);
            return None;
        }

        match self.store.get(&key) {
            Ok(Some(StoreValue::Str(json))) => match serde_json::from_str(&json) {
                Ok(times) => Some(times),
                Err(e) => {
                    warn!("cannot parse cached entry {key}: {e}");
                    self.purge(&key);
                    None
                }
            },
            Ok(_) => {
                self.purge(&key);
                None
            }
            Err(e) => {
                warn!("cache read failed for {key}: {e}");
                None
            }
        }
    }

    /// Write an entry at the current time.
    pub fn put(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
        method: Option<&str>,
        school: Option<&str>,
        times: &DayTimes,
    ) {
        self.put_at(date, coordinates, method, school, times, Utc::now());
    }

    /// Write an entry, stamping its expiration as `now` + the retention
    /// window. A prior entry under the same key is overwritten. Store
    /// failures are logged no-ops.
    pub fn put_at(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
        method: Option<&str>,
        school: Option<&str>,
        times: &DayTimes,
        now: DateTime<Utc>,
    ) {
        let key = cache_key(date, coordinates, method, school);

        let json = match serde_json::to_string(times) {
            Ok(json) => json,
            Err(e) => {
                warn!("cannot serialize entry for {key}: {e}");
                return;
            }
        };

        let expires_at = now + Duration::days(RETENTION_DAYS);
        if let Err(e) = self.store.save(&key, StoreValue::Str(json)) {
            warn!("cache write failed for {key}: {e}");
            return;
        }
        if let Err(e) = self.store.save(
            &format!("{key}{EXPIRATION_SUFFIX}"),
            StoreValue::Int(expires_at.timestamp_millis()),
        ) {
            warn!("cache expiration write failed for {key}: {e}");
        }

        debug!("cached prayer times under {key}");
    }

    /// Fill the cache for each day in `[start, start + days)` not already
    /// cached, invoking `supplier` for the missing ones.
    ///
    /// Individual-day failures are logged and do not abort the remaining
    /// days.
    pub fn prefetch<F>(
        &self,
        start: NaiveDate,
        days: u32,
        coordinates: Coordinates,
        method: Option<&str>,
        school: Option<&str>,
        supplier: F,
    ) where
        F: Fn(NaiveDate) -> crate::Result<DayTimes>,
    {
        for offset in 0..days {
            let Some(date) = start.checked_add_days(Days::new(u64::from(offset))) else {
                warn!("prefetch date overflow at {start} + {offset} days");
                return;
            };

            if self.get(date, coordinates, method, school).is_some() {
                continue;
            }

            match supplier(date) {
                Ok(times) => self.put(date, coordinates, method, school, &times),
                Err(e) => warn!("prefetch failed for {date}: {e}"),
            }
        }
    }

    /// Secondary cleanup pass: purge every cached entry whose embedded date
    /// is older than the retention window.
    ///
    /// Unlike [`get_at`](Self::get_at), which compares the stored expiration
    /// instant, this compares the date baked into the key, so it also catches
    /// entries whose expiration record was lost.
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    /// [`sweep`](Self::sweep) with an explicit current instant.
    pub fn sweep_at(&self, now: DateTime<Utc>) {
        let keys = match self.store.list_keys(CACHE_KEY_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache sweep cannot list keys: {e}");
                return;
            }
        };

        let cutoff = now.date_naive() - Duration::days(RETENTION_DAYS);
        let mut purged = 0usize;

        for key in keys {
            if key.ends_with(EXPIRATION_SUFFIX) {
                continue;
            }
            let Some(date) = embedded_date(&key) else {
                continue;
            };
            if date < cutoff {
                self.purge(&key);
                purged += 1;
            }
        }

        if purged > 0 {
            debug!("cache sweep purged {purged} stale entries");
        }
    }

    /// Remove every cache record (entries and expirations).
    pub fn clear(&self) {
        let keys = match self.store.list_keys(CACHE_KEY_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("cache clear cannot list keys: {e}");
                return;
            }
        };

        for key in keys {
            if let Err(e) = self.store.remove(&key) {
                warn!("cache clear cannot remove {key}: {e}");
            }
        }
    }

    /// Remove an entry and its expiration record, tolerating store failures.
    fn purge(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("cache purge cannot remove {key}: {e}");
        }
        let expiration_key = format!("{key}{EXPIRATION_SUFFIX}");
        if let Err(e) = self.store.remove(&expiration_key) {
            warn!("cache purge cannot remove {expiration_key}: {e}");
        }
    }
}

/// Extract the `YYYY-MM-DD` date embedded in a cache key.
fn embedded_date(key: &str) -> Option<NaiveDate> {
    let rest = key.strip_prefix(CACHE_KEY_PREFIX)?;
    let date_part = rest.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::test_utils::MemoryStore;
    use chrono::TimeZone;

    fn mecca() -> Coordinates {
        Coordinates::new(21.4225, 39.8262)
    }

    fn sample_times() -> DayTimes {
        DayTimes {
            dawn: Some(Utc.with_ymd_and_hms(2024, 3, 10, 2, 31, 0).unwrap()),
            sunrise: Some(Utc.with_ymd_and_hms(2024, 3, 10, 3, 48, 0).unwrap()),
            midday: Some(Utc.with_ymd_and_hms(2024, 3, 10, 9, 29, 0).unwrap()),
            afternoon: Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 52, 0).unwrap()),
            sunset: Some(Utc.with_ymd_and_hms(2024, 3, 10, 15, 10, 0).unwrap()),
            night: Some(Utc.with_ymd_and_hms(2024, 3, 10, 16, 40, 0).unwrap()),
        }
    }

    fn cache_over_memory() -> (Arc<MemoryStore>, PrayerTimeCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = PrayerTimeCache::new(store.clone());
        (store, cache)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn key_is_deterministic_and_component_sensitive() {
        let base = cache_key(
            date(2024, 3, 10),
            mecca(),
            Some("MuslimWorldLeague"),
            Some("shafi"),
        );
        assert_eq!(
            base,
            cache_key(
                date(2024, 3, 10),
                mecca(),
                Some("MuslimWorldLeague"),
                Some("shafi"),
            )
        );
        assert_eq!(
            base,
            "prayer_times_2024-03-10_21.4225_39.8262_MuslimWorldLeague_shafi"
        );

        let variants = [
            cache_key(
                date(2024, 3, 11),
                mecca(),
                Some("MuslimWorldLeague"),
                Some("shafi"),
            ),
            cache_key(
                date(2024, 3, 10),
                Coordinates::new(21.4226, 39.8262),
                Some("MuslimWorldLeague"),
                Some("shafi"),
            ),
            cache_key(
                date(2024, 3, 10),
                Coordinates::new(21.4225, 39.8263),
                Some("MuslimWorldLeague"),
                Some("shafi"),
            ),
            cache_key(date(2024, 3, 10), mecca(), Some("Egyptian"), Some("shafi")),
            cache_key(
                date(2024, 3, 10),
                mecca(),
                Some("MuslimWorldLeague"),
                Some("hanafi"),
            ),
        ];
        for variant in &variants {
            assert_ne!(base, *variant);
        }
    }

    #[test]
    fn absent_method_and_school_use_default_token() {
        let key = cache_key(date(2024, 3, 10), mecca(), None, None);
        assert_eq!(key, "prayer_times_2024-03-10_21.4225_39.8262_default_default");
    }

    #[test]
    fn coordinates_format_to_four_decimals() {
        let key = cache_key(
            date(2024, 3, 10),
            Coordinates::new(21.0, -0.123456),
            None,
            None,
        );
        assert_eq!(key, "prayer_times_2024-03-10_21.0000_-0.1235_default_default");
    }

    #[test]
    fn put_then_get_returns_identical_instants() {
        // Scenario: miss, compute, put, immediate get.
        let (_store, cache) = cache_over_memory();
        let d = date(2024, 3, 10);
        let method = Some("MuslimWorldLeague");
        let school = Some("shafi");

        assert!(cache.get(d, mecca(), method, school).is_none());

        let times = sample_times();
        cache.put(d, mecca(), method, school, &times);

        let cached = cache.get(d, mecca(), method, school).expect("cache hit");
        assert_eq!(cached, times);
    }

    #[test]
    fn entry_is_live_up_to_expiration_and_purged_after() {
        let (store, cache) = cache_over_memory();
        let d = date(2024, 1, 1);
        let written_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        cache.put_at(d, mecca(), None, None, &sample_times(), written_at);

        // Still live exactly at the retention boundary.
        let boundary = written_at + Duration::days(RETENTION_DAYS);
        assert!(cache.get_at(d, mecca(), None, None, boundary).is_some());

        // 31 days later: miss, and both records are gone.
        let later = written_at + Duration::days(31);
        assert!(cache.get_at(d, mecca(), None, None, later).is_none());
        assert!(store.list_keys(CACHE_KEY_PREFIX).unwrap().is_empty());
    }

    #[test]
    fn missing_expiration_record_is_a_miss_and_purges_data() {
        let (store, cache) = cache_over_memory();
        let d = date(2024, 3, 10);
        let key = cache_key(d, mecca(), None, None);

        // Entry written without its expiration record.
        store
            .save(
                &key,
                StoreValue::Str(serde_json::to_string(&sample_times()).unwrap()),
            )
            .unwrap();

        assert!(cache.get(d, mecca(), None, None).is_none());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss_and_purged() {
        let (store, cache) = cache_over_memory();
        let d = date(2024, 3, 10);
        let key = cache_key(d, mecca(), None, None);
        let far_future = Utc::now() + Duration::days(1);

        store
            .save(&key, StoreValue::Str("{broken".to_owned()))
            .unwrap();
        store
            .save(
                &format!("{key}_expiration"),
                StoreValue::Int(far_future.timestamp_millis()),
            )
            .unwrap();

        assert!(cache.get(d, mecca(), None, None).is_none());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn read_failure_degrades_to_miss() {
        let (store, cache) = cache_over_memory();
        let d = date(2024, 3, 10);
        cache.put(d, mecca(), None, None, &sample_times());

        store.fail_reads(true);
        assert!(cache.get(d, mecca(), None, None).is_none());
    }

    #[test]
    fn write_failure_is_a_no_op() {
        let (store, cache) = cache_over_memory();
        let d = date(2024, 3, 10);

        store.fail_writes(true);
        cache.put(d, mecca(), None, None, &sample_times());

        store.fail_writes(false);
        store.fail_reads(false);
        assert!(cache.get(d, mecca(), None, None).is_none());
    }

    #[test]
    fn prefetch_fills_only_missing_days_and_survives_failures() {
        let (_store, cache) = cache_over_memory();
        let start = date(2024, 3, 10);

        // Day 1 is already cached.
        cache.put(
            date(2024, 3, 11),
            mecca(),
            None,
            None,
            &sample_times(),
        );

        let supplied = std::cell::RefCell::new(Vec::new());
        cache.prefetch(start, 4, mecca(), None, None, |d| {
            supplied.borrow_mut().push(d);
            if d == date(2024, 3, 12) {
                return Err(crate::VakitError::Engine("polar day".to_owned()));
            }
            Ok(sample_times())
        });

        // Supplier ran for the three uncached days only.
        assert_eq!(
            supplied.into_inner(),
            vec![date(2024, 3, 10), date(2024, 3, 12), date(2024, 3, 13)]
        );

        assert!(cache.get(date(2024, 3, 10), mecca(), None, None).is_some());
        assert!(cache.get(date(2024, 3, 11), mecca(), None, None).is_some());
        assert!(cache.get(date(2024, 3, 12), mecca(), None, None).is_none());
        assert!(cache.get(date(2024, 3, 13), mecca(), None, None).is_some());
    }

    #[test]
    fn sweep_purges_by_embedded_date() {
        let (store, cache) = cache_over_memory();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        // Old entry; its expiration record claims it is still live, but the
        // embedded date is past the retention window.
        let old = date(2024, 1, 1);
        cache.put_at(old, mecca(), None, None, &sample_times(), now);
        let fresh = date(2024, 3, 9);
        cache.put_at(fresh, mecca(), None, None, &sample_times(), now);

        cache.sweep_at(now);

        assert!(store
            .list_keys(&cache_key(old, mecca(), None, None))
            .unwrap()
            .is_empty());
        assert!(cache.get_at(fresh, mecca(), None, None, now).is_some());
    }

    #[test]
    fn clear_removes_every_cache_record() {
        let (store, cache) = cache_over_memory();
        cache.put(date(2024, 3, 10), mecca(), None, None, &sample_times());
        cache.put(date(2024, 3, 11), mecca(), None, None, &sample_times());
        store
            .save("app_settings", StoreValue::Str("{}".to_owned()))
            .unwrap();

        cache.clear();

        assert!(store.list_keys(CACHE_KEY_PREFIX).unwrap().is_empty());
        assert!(store.get("app_settings").unwrap().is_some());
    }

    #[test]
    fn embedded_date_parses_cache_keys() {
        assert_eq!(
            embedded_date("prayer_times_2024-03-10_21.4225_39.8262_default_default"),
            Some(date(2024, 3, 10))
        );
        assert!(embedded_date("prayer_times_garbage").is_none());
    }
}

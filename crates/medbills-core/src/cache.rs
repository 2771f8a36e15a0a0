//! Time-boxed memoization of the two list queries.
//!
//! Staleness inside the window is accepted. Every write clears both slots so
//! the next read after a write always goes to the store.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::db::{RecordStore, StoreResult};
use crate::models::{Bill, Doctor};

/// How long a doctor list stays fresh.
pub const DOCTORS_TTL: Duration = Duration::from_secs(5 * 60);

/// How long a bill list stays fresh.
pub const BILLS_TTL: Duration = Duration::from_secs(60);

struct SlotState<T> {
    /// Bumped by every clear; a fetch that started under an older value is not stored.
    generation: u64,
    entry: Option<(Instant, Vec<T>)>,
}

struct Slot<T> {
    name: &'static str,
    ttl: Duration,
    state: Mutex<SlotState<T>>,
}

impl<T: Clone> Slot<T> {
    fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            state: Mutex::new(SlotState {
                generation: 0,
                entry: None,
            }),
        }
    }

    fn get_or_fetch(
        &self,
        now: Instant,
        fetch: impl FnOnce() -> StoreResult<Vec<T>>,
    ) -> StoreResult<Vec<T>> {
        let generation = {
            let state = self.lock();
            if let Some((fetched_at, rows)) = &state.entry {
                if now.saturating_duration_since(*fetched_at) < self.ttl {
                    debug!(slot = self.name, "Cache hit");
                    return Ok(rows.clone());
                }
            }
            state.generation
        };

        debug!(slot = self.name, "Cache miss");
        // A failed fetch leaves whatever was cached in place.
        let rows = fetch()?;

        let mut state = self.lock();
        if state.generation == generation {
            state.entry = Some((now, rows.clone()));
        } else {
            debug!(slot = self.name, "Cleared during fetch, not storing");
        }
        Ok(rows)
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        state.entry = None;
    }

    fn is_empty(&self) -> bool {
        self.lock().entry.is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide read cache for doctors and bills.
pub struct ReadCache {
    doctors: Slot<Doctor>,
    bills: Slot<Bill>,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::with_ttls(DOCTORS_TTL, BILLS_TTL)
    }

    pub fn with_ttls(doctors_ttl: Duration, bills_ttl: Duration) -> Self {
        Self {
            doctors: Slot::new("doctors", doctors_ttl),
            bills: Slot::new("bills", bills_ttl),
        }
    }

    pub fn get_doctors(&self, store: &dyn RecordStore) -> StoreResult<Vec<Doctor>> {
        self.get_doctors_at(store, Instant::now())
    }

    pub fn get_bills(&self, store: &dyn RecordStore) -> StoreResult<Vec<Bill>> {
        self.get_bills_at(store, Instant::now())
    }

    pub fn get_doctors_at(&self, store: &dyn RecordStore, now: Instant) -> StoreResult<Vec<Doctor>> {
        self.doctors.get_or_fetch(now, || store.list_doctors())
    }

    pub fn get_bills_at(&self, store: &dyn RecordStore, now: Instant) -> StoreResult<Vec<Bill>> {
        self.bills.get_or_fetch(now, || store.list_bills())
    }

    /// Drop every cached read. Called after any successful insert or delete.
    pub fn clear(&self) {
        debug!("Clearing read cache");
        self.doctors.clear();
        self.bills.clear();
    }

    /// True when neither list is cached.
    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty() && self.bills.is_empty()
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteStore, StoreError};
    use crate::models::{NewBill, NewDoctor, RecordId};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    /// Counts list calls and can be told to fail.
    struct CountingStore {
        inner: SqliteStore,
        list_calls: AtomicUsize,
        fail_reads: AtomicBool,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: SqliteStore::open_in_memory().unwrap(),
                list_calls: AtomicUsize::new(0),
                fail_reads: AtomicBool::new(false),
            }
        }

        fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn read<T>(&self, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Http("connection refused".into()));
            }
            f()
        }
    }

    impl RecordStore for CountingStore {
        fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
            self.read(|| self.inner.list_doctors())
        }
        fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor> {
            self.inner.insert_doctor(doctor)
        }
        fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool> {
            self.inner.delete_doctor(id)
        }
        fn list_bills(&self) -> StoreResult<Vec<Bill>> {
            self.read(|| self.inner.list_bills())
        }
        fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill> {
            self.inner.insert_bill(bill)
        }
        fn delete_bill(&self, id: &RecordId) -> StoreResult<bool> {
            self.inner.delete_bill(id)
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let store = CountingStore::new();
        let cache = ReadCache::new();
        let t0 = Instant::now();

        cache.get_doctors_at(&store, t0).unwrap();
        cache.get_doctors_at(&store, t0 + Duration::from_secs(299)).unwrap();
        assert_eq!(store.calls(), 1);

        cache.get_doctors_at(&store, t0 + DOCTORS_TTL).unwrap();
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn test_bills_expire_sooner() {
        let store = CountingStore::new();
        let cache = ReadCache::new();
        let t0 = Instant::now();

        cache.get_bills_at(&store, t0).unwrap();
        cache.get_bills_at(&store, t0 + Duration::from_secs(59)).unwrap();
        assert_eq!(store.calls(), 1);

        cache.get_bills_at(&store, t0 + Duration::from_secs(61)).unwrap();
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn test_stale_until_cleared() {
        let store = CountingStore::new();
        let cache = ReadCache::new();

        assert!(cache.get_doctors(&store).unwrap().is_empty());
        store.insert_doctor(&NewDoctor::new("Dr. Rao")).unwrap();

        // Still within the window: stale by design
        assert!(cache.get_doctors(&store).unwrap().is_empty());

        cache.clear();
        assert_eq!(cache.get_doctors(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_drops_both_slots() {
        let store = CountingStore::new();
        let cache = ReadCache::new();

        cache.get_doctors(&store).unwrap();
        cache.get_bills(&store).unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_read_leaves_cache_untouched() {
        let store = CountingStore::new();
        let cache = ReadCache::new();
        let t0 = Instant::now();

        store.insert_doctor(&NewDoctor::new("Dr. Rao")).unwrap();
        cache.get_doctors_at(&store, t0).unwrap();

        store.fail_reads.store(true, Ordering::SeqCst);
        let expired = t0 + DOCTORS_TTL + Duration::from_secs(1);
        assert!(cache.get_doctors_at(&store, expired).is_err());

        // Previous entry is still there and still fresh relative to t0
        store.fail_reads.store(false, Ordering::SeqCst);
        let calls = store.calls();
        assert_eq!(cache.get_doctors_at(&store, t0).unwrap().len(), 1);
        assert_eq!(store.calls(), calls);
    }

    /// Holds one `list_bills` call between two barrier waits after it has read.
    struct GatedStore {
        inner: SqliteStore,
        gate: Barrier,
        armed: AtomicBool,
    }

    impl RecordStore for GatedStore {
        fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
            self.inner.list_doctors()
        }
        fn insert_doctor(&self, doctor: &NewDoctor) -> StoreResult<Doctor> {
            self.inner.insert_doctor(doctor)
        }
        fn delete_doctor(&self, id: &RecordId) -> StoreResult<bool> {
            self.inner.delete_doctor(id)
        }
        fn list_bills(&self) -> StoreResult<Vec<Bill>> {
            let rows = self.inner.list_bills();
            if self.armed.swap(false, Ordering::SeqCst) {
                self.gate.wait();
                self.gate.wait();
            }
            rows
        }
        fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill> {
            self.inner.insert_bill(bill)
        }
        fn delete_bill(&self, id: &RecordId) -> StoreResult<bool> {
            self.inner.delete_bill(id)
        }
    }

    #[test]
    fn test_clear_during_fetch_is_not_lost() {
        let store = GatedStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            gate: Barrier::new(2),
            armed: AtomicBool::new(true),
        };
        let cache = ReadCache::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        thread::scope(|s| {
            let reader = s.spawn(|| cache.get_bills(&store).unwrap().len());

            // Reader has its rows but has not stored them yet
            store.gate.wait();
            store
                .insert_bill(&NewBill::new("Acme", None, date, 10.0, None))
                .unwrap();
            cache.clear();
            store.gate.wait();

            assert_eq!(reader.join().unwrap(), 0);
        });

        assert_eq!(cache.get_bills(&store).unwrap().len(), 1);
    }
}

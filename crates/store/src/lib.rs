//! In-memory device aggregation store.
//!
//! Owns the map of device identifier to [`DeviceStats`] behind a single
//! store-wide `RwLock`: exclusive access for mutation and creation, shared
//! access for snapshots and counting. The raw map is never exposed; callers
//! go through [`DeviceStore::with_device`] for read-modify-write and
//! [`DeviceStore::snapshot`] for decoupled point-in-time copies.
//!
//! The lock is deliberately store-wide rather than per-record. At fixed
//! fleet sizes a single lock is not a bottleneck, and it makes the
//! check-then-mutate composition atomic without any lock-ordering rules.
//! Update closures run inside the critical section and must stay fast and
//! free of I/O.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fleet_core::device::DeviceStats;
use fleet_core::error::CoreError;

/// Errors from the bootstrap loader. Fatal at startup: the process does not
/// serve without a loaded fleet.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to load device registry: {0}")]
    Registry(#[from] csv::Error),
}

/// Concurrency-safe container mapping device identifier to its aggregate.
#[derive(Debug, Default)]
pub struct DeviceStore {
    devices: RwLock<HashMap<String, DeviceStats>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the identifier has a record. Never mutates.
    pub fn exists(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Number of distinct registered identifiers.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Register an identifier with a zero-valued record. Idempotent: an
    /// already-registered identifier keeps its existing aggregate.
    pub fn register(&self, id: &str) {
        self.write()
            .entry(id.to_string())
            .or_insert_with(|| DeviceStats::new(id));
    }

    /// Run `update` with exclusive mutable access to the record for `id`,
    /// creating a fresh zero-valued record if absent.
    ///
    /// The whole store stays locked for the duration of the call, so no
    /// partial update is ever visible to other callers. Whatever error the
    /// closure returns is propagated verbatim.
    ///
    /// Auto-creation is the contract here; callers that must reject unknown
    /// identifiers check [`DeviceStore::exists`] first.
    pub fn with_device<F>(&self, id: &str, update: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut DeviceStats) -> Result<(), CoreError>,
    {
        let mut devices = self.write();
        let stats = devices
            .entry(id.to_string())
            .or_insert_with(|| DeviceStats::new(id));
        update(stats)
    }

    /// A deep copy of the record for `id`, decoupled from the live store.
    ///
    /// The returned value is safe to retain, mutate, or serialize without
    /// further synchronization.
    pub fn snapshot(&self, id: &str) -> Result<DeviceStats, CoreError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::device_not_found(id))
    }

    /// Bulk-register identifiers from a CSV file: a header row, then one
    /// identifier in the first field of each remaining row. Blank rows are
    /// skipped and duplicates are idempotent no-ops.
    pub fn load_from_csv(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        for record in reader.records() {
            let record = record?;
            let Some(id) = record.get(0) else {
                continue;
            };
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            self.register(id);
        }

        tracing::debug!(
            path = %path.as_ref().display(),
            devices = self.count(),
            "Device registry loaded"
        );
        Ok(())
    }

    // A poisoned lock means a panic inside an earlier critical section; the
    // counters themselves are still structurally valid, so recover the
    // guard instead of propagating the panic to every later caller.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, DeviceStats>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, DeviceStats>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    const ID: &str = "aa-bb-cc-dd-ee-01";

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 10, min, 0).unwrap()
    }

    // -- register / exists / count --

    #[test]
    fn exists_is_false_for_unregistered_identifiers() {
        let store = DeviceStore::new();
        assert!(!store.exists(ID));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn register_is_idempotent() {
        let store = DeviceStore::new();
        store.register(ID);
        store
            .with_device(ID, |stats| {
                stats.record_heartbeat(ts(0));
                Ok(())
            })
            .unwrap();

        // A second registration must not reset the aggregate.
        store.register(ID);

        assert_eq!(store.count(), 1);
        assert_eq!(store.snapshot(ID).unwrap().heartbeat_count, 1);
    }

    // -- with_device --

    #[test]
    fn with_device_auto_creates_a_zero_valued_record() {
        let store = DeviceStore::new();

        store
            .with_device(ID, |stats| {
                assert_eq!(stats.id, ID);
                assert_eq!(stats.heartbeat_count, 0);
                assert_eq!(stats.upload_count, 0);
                assert_eq!(stats.first_heartbeat, None);
                Ok(())
            })
            .unwrap();

        assert!(store.exists(ID));
    }

    #[test]
    fn with_device_mutates_the_same_record_across_calls() {
        let store = DeviceStore::new();

        for minute in [30, 0, 45] {
            store
                .with_device(ID, |stats| {
                    stats.record_heartbeat(ts(minute));
                    Ok(())
                })
                .unwrap();
        }

        let snap = store.snapshot(ID).unwrap();
        assert_eq!(snap.heartbeat_count, 3);
        assert_eq!(snap.first_heartbeat, Some(ts(0)));
        assert_eq!(snap.last_heartbeat, Some(ts(45)));
    }

    #[test]
    fn with_device_propagates_the_closure_error_verbatim() {
        let store = DeviceStore::new();
        store.register(ID);

        let err = store
            .with_device(ID, |_| Err(CoreError::Internal("boom".into())))
            .unwrap_err();

        assert!(matches!(err, CoreError::Internal(msg) if msg == "boom"));
    }

    // -- snapshot --

    #[test]
    fn snapshot_of_an_unknown_identifier_is_not_found() {
        let store = DeviceStore::new();
        let err = store.snapshot("aa-bb-cc-dd-ee-99").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn snapshot_is_decoupled_from_the_live_record() {
        let store = DeviceStore::new();
        store
            .with_device(ID, |stats| {
                stats.record_heartbeat(ts(0));
                Ok(())
            })
            .unwrap();

        let mut snap = store.snapshot(ID).unwrap();
        snap.heartbeat_count = 9999;
        snap.record_upload(1_000_000);

        let fresh = store.snapshot(ID).unwrap();
        assert_eq!(fresh.heartbeat_count, 1);
        assert_eq!(fresh.upload_count, 0);
    }

    // -- concurrency --

    #[test]
    fn concurrent_updates_never_lose_a_heartbeat() {
        const WRITERS: usize = 32;
        const BEATS_PER_WRITER: usize = 25;

        let store = Arc::new(DeviceStore::new());
        store.register(ID);

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for b in 0..BEATS_PER_WRITER {
                        store
                            .with_device(ID, |stats| {
                                stats.record_heartbeat(ts(((w + b) % 60) as u32));
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snap = store.snapshot(ID).unwrap();
        assert_eq!(snap.heartbeat_count, (WRITERS * BEATS_PER_WRITER) as i64);
    }

    #[test]
    fn concurrent_reads_and_writes_stay_consistent() {
        let store = Arc::new(DeviceStore::new());
        store.register(ID);

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for minute in 0..60 {
                    store
                        .with_device(ID, |stats| {
                            stats.record_heartbeat(ts(minute));
                            stats.record_upload(1_000);
                            Ok(())
                        })
                        .unwrap();
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..60 {
                    let snap = store.snapshot(ID).unwrap();
                    // Heartbeats and uploads are written inside one critical
                    // section, so a snapshot never observes them torn.
                    assert_eq!(snap.heartbeat_count, snap.upload_count);
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }

    // -- load_from_csv --

    fn write_registry(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn load_from_csv_registers_every_row_after_the_header() {
        let file = write_registry(
            "device_id\naa-bb-cc-dd-ee-01\naa-bb-cc-dd-ee-02\naa-bb-cc-dd-ee-03\n",
        );

        let store = DeviceStore::new();
        store.load_from_csv(file.path()).unwrap();

        assert_eq!(store.count(), 3);
        for id in ["aa-bb-cc-dd-ee-01", "aa-bb-cc-dd-ee-02", "aa-bb-cc-dd-ee-03"] {
            assert!(store.exists(id), "expected {id} to be registered");
        }
    }

    #[test]
    fn load_from_csv_ignores_duplicate_identifiers() {
        let file = write_registry("device_id\naa-bb-cc-dd-ee-01\naa-bb-cc-dd-ee-01\n");

        let store = DeviceStore::new();
        store.load_from_csv(file.path()).unwrap();

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn load_from_csv_fails_for_a_missing_file() {
        let store = DeviceStore::new();
        let result = store.load_from_csv("does-not-exist.csv");
        assert!(matches!(result, Err(StoreError::Registry(_))));
    }

    #[test]
    fn loaded_records_start_zero_valued() {
        let file = write_registry("device_id\naa-bb-cc-dd-ee-01\n");

        let store = DeviceStore::new();
        store.load_from_csv(file.path()).unwrap();

        let snap = store.snapshot("aa-bb-cc-dd-ee-01").unwrap();
        assert_eq!(snap, DeviceStats::new("aa-bb-cc-dd-ee-01"));
    }
}

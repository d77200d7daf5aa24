//! Two-layer cache for the name index.
//!
//! The in-process layer lives as long as the sidecar. The persisted layer is
//! a keyed string store with a TTL, so a restarted process can skip the full
//! scan until the persisted copy expires. `invalidate` clears both.

use crate::clock::Clock;
use crate::error::{CheckInError, StoreError};
use crate::index::{IndexBuild, IndexBuilder, NameIndex};
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const INDEX_CACHE_KEY: &str = "nameIndex";

/// Shared across request threads, so implementations synchronize internally.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteCacheStore {
    pub fn new(conn: Connection, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock,
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?",
                [key],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((value, expires_at)) if expires_at > self.clock.epoch_secs() => Ok(Some(value)),
            Some(_) => {
                conn.execute("DELETE FROM cache_entries WHERE key = ?", [key])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self
            .clock
            .epoch_secs()
            .saturating_add(ttl.as_secs() as i64);
        self.conn().execute(
            "INSERT INTO cache_entries(key, value, expires_at)
             VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               expires_at = excluded.expires_at",
            (key, value, expires_at),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM cache_entries WHERE key = ?", [key])?;
        Ok(())
    }
}

pub struct IndexCache {
    persisted: Box<dyn CacheStore>,
    memory: Mutex<Option<Arc<NameIndex>>>,
    // Held across a build so concurrent misses scan the partitions once.
    build_gate: Mutex<()>,
    ttl: Duration,
}

impl IndexCache {
    pub fn new(persisted: Box<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            persisted,
            memory: Mutex::new(None),
            build_gate: Mutex::new(()),
            ttl,
        }
    }

    fn memory_get(&self) -> Option<Arc<NameIndex>> {
        match self.memory.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn memory_set(&self, value: Option<Arc<NameIndex>>) {
        match self.memory.lock() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    fn persisted_get(&self, fingerprint: &str) -> Option<NameIndex> {
        let raw = match self.persisted.get(INDEX_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("persisted index read failed, treating as miss: {e}");
                return None;
            }
        };
        let index: NameIndex = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("persisted index is unreadable, treating as miss: {e}");
                return None;
            }
        };
        if index.fingerprint != fingerprint {
            debug!("persisted index was built for another registry or sheet layout");
            return None;
        }
        if index.is_empty() {
            return None;
        }
        Some(index)
    }

    /// In-process copy, then the persisted copy, then a fresh build.
    pub fn get(
        &self,
        builder: &IndexBuilder<'_>,
        clock: &dyn Clock,
    ) -> Result<Arc<NameIndex>, CheckInError> {
        if let Some(index) = self.memory_get() {
            return Ok(index);
        }

        let _gate = match self.build_gate.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(index) = self.memory_get() {
            return Ok(index);
        }

        if let Some(index) = self.persisted_get(&builder.fingerprint()) {
            debug!(build_id = %index.build_id, "name index loaded from persisted cache");
            let index = Arc::new(index);
            self.memory_set(Some(index.clone()));
            return Ok(index);
        }

        info!("name index cache miss, rebuilding");
        let build = builder.build(clock.now());
        self.put(build)
    }

    /// Stores a completed build in both layers. Empty builds are refused.
    pub fn put(&self, build: IndexBuild) -> Result<Arc<NameIndex>, CheckInError> {
        if build.index.is_empty() {
            warn!(
                skipped = build.skipped.len(),
                "name index build produced no entries"
            );
            return Err(CheckInError::IndexUnavailable);
        }
        match serde_json::to_string(&build.index) {
            Ok(raw) => {
                if let Err(e) = self.persisted.put(INDEX_CACHE_KEY, &raw, self.ttl) {
                    warn!("persisting name index failed, keeping it in memory only: {e}");
                }
            }
            Err(e) => warn!("serializing name index failed: {e}"),
        }
        let index = Arc::new(build.index);
        self.memory_set(Some(index.clone()));
        Ok(index)
    }

    pub fn invalidate(&self) {
        self.memory_set(None);
        if let Err(e) = self.persisted.remove(INDEX_CACHE_KEY) {
            warn!("removing persisted name index failed: {e}");
        }
        info!("name index cache cleared");
    }

    pub fn is_warm(&self) -> bool {
        self.memory_get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::SheetLayout;
    use crate::registry::{ClassPartition, PartitionRegistry};
    use crate::store::{Cell, PartitionStore};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    /// One class with one student; counts full-sheet reads.
    struct OneClassStore {
        scans: Arc<AtomicUsize>,
    }

    impl PartitionStore for OneClassStore {
        fn read_rows(
            &self,
            _partition: &str,
            _sheet: &str,
        ) -> Result<Option<Vec<Vec<Cell>>>, StoreError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            // Widen the window in which other callers miss.
            thread::sleep(Duration::from_millis(20));
            Ok(Some(vec![vec![
                Cell::Number(1.0),
                Cell::text("Giuse"),
                Cell::text("Trần"),
                Cell::text("Khôi"),
            ]]))
        }

        fn read_row(
            &self,
            _partition: &str,
            _sheet: &str,
            _row: usize,
        ) -> Result<Option<Vec<Cell>>, StoreError> {
            Ok(None)
        }

        fn write_cell(
            &self,
            _partition: &str,
            _sheet: &str,
            _row: usize,
            _col: usize,
            _cell: &Cell,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        fn replace_sheet(
            &self,
            _partition: &str,
            _sheet: &str,
            _rows: &[Vec<Cell>],
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn cache_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open memory db");
        conn.execute(
            "CREATE TABLE cache_entries(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .expect("schema");
        conn
    }

    #[test]
    fn entries_expire_after_ttl() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 10)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("timestamp");
        let clock = Arc::new(FixedClock::new(start));
        let store = SqliteCacheStore::new(cache_conn(), clock.clone());

        store
            .put("k", "v", Duration::from_secs(60))
            .expect("put");
        assert_eq!(store.get("k").expect("get"), Some("v".to_string()));

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(store.get("k").expect("get"), Some("v".to_string()));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn remove_drops_entry() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 10)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("timestamp");
        let store = SqliteCacheStore::new(cache_conn(), Arc::new(FixedClock::new(start)));
        store.put("k", "v", Duration::from_secs(60)).expect("put");
        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn concurrent_misses_build_once() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 10)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("timestamp");
        let clock = Arc::new(FixedClock::new(start));
        let cache = IndexCache::new(
            Box::new(SqliteCacheStore::new(cache_conn(), clock.clone())),
            Duration::from_secs(60),
        );
        let registry = PartitionRegistry::new(vec![ClassPartition {
            class_code: "c1".to_string(),
            partition: "P1".to_string(),
            link: None,
        }])
        .expect("registry");
        let layout = SheetLayout::default();
        let scans = Arc::new(AtomicUsize::new(0));
        let barrier = Barrier::new(8);

        let ids: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        let store = OneClassStore {
                            scans: scans.clone(),
                        };
                        let builder = IndexBuilder::new(&store, &registry, &layout);
                        barrier.wait();
                        cache.get(&builder, clock.as_ref()).expect("index").build_id
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread"))
                .collect()
        });

        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }
}

use crate::cache::{IndexCache, SqliteCacheStore};
use crate::classifier::{classify, truncate_to_seconds, Classification, Status};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db;
use crate::error::CheckInError;
use crate::index::{IndexBuilder, NameIndex, SkippedPartition};
use crate::locator::locate_today_column;
use crate::registry::ClassPartition;
use crate::resolver::{resolve, split_scan};
use crate::roster::{scan_codes, ScanCode};
use crate::store::{Cell, PartitionStore, SqliteStore};
use chrono::NaiveTime;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    Recorded {
        name: String,
        class_code: String,
        time: NaiveTime,
        partition: String,
        row: usize,
        col: usize,
        status: Status,
    },
    Skipped {
        name: String,
        class_code: String,
        time: NaiveTime,
    },
}

#[derive(Debug, Clone)]
pub struct RebuildSummary {
    pub index: Arc<NameIndex>,
    pub skipped: Vec<SkippedPartition>,
    pub collisions: usize,
}

/// Flattens a check-in result into the one line the scanner shows.
pub fn render(result: &Result<CheckInOutcome, CheckInError>) -> String {
    match result {
        Ok(CheckInOutcome::Recorded {
            name,
            class_code,
            time,
            ..
        }) => format!(
            "Success: {} ({}) checked in at {}.",
            name,
            class_code,
            time.format("%H:%M:%S")
        ),
        Ok(CheckInOutcome::Skipped { name, .. }) => format!(
            "Skipped: No attendance marked between 09:10 and 10:00 for {}",
            name
        ),
        Err(e) => format!("Error: {}", e),
    }
}

pub struct CheckInService {
    store: Box<dyn PartitionStore>,
    cache: IndexCache,
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl CheckInService {
    pub fn new(
        store: Box<dyn PartitionStore>,
        cache: IndexCache,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            clock,
        }
    }

    /// Wires the SQLite store and cache of `workspace` together.
    pub fn open(workspace: &Path, config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let store = SqliteStore::new(db::open_db(workspace)?);
        let cache_store = SqliteCacheStore::new(db::open_db(workspace)?, clock.clone());
        let cache = IndexCache::new(Box::new(cache_store), config.cache_ttl);
        Ok(Self::new(Box::new(store), cache, config, clock))
    }

    pub fn store(&self) -> &dyn PartitionStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    fn builder(&self) -> IndexBuilder<'_> {
        IndexBuilder::new(
            self.store.as_ref(),
            &self.config.registry,
            &self.config.layout,
        )
    }

    pub fn index(&self) -> Result<Arc<NameIndex>, CheckInError> {
        self.cache.get(&self.builder(), self.clock.as_ref())
    }

    pub fn check_in(
        &self,
        raw: &str,
        claimed_class: Option<&str>,
    ) -> Result<CheckInOutcome, CheckInError> {
        info!(scan = %raw.trim(), "check-in start");
        // Reject garbage before touching the index.
        if claimed_class.is_none() {
            split_scan(raw)?;
        }

        let index = self.index()?;
        let target = resolve(&index, &self.config.registry, raw, claimed_class)?;
        let layout = &self.config.layout;
        let sheet = layout.attendance_sheet.as_str();

        let header = self
            .store
            .read_row(&target.partition, sheet, layout.header_row)
            .map_err(|e| CheckInError::from_store(&target.partition, e))?
            .ok_or_else(|| CheckInError::MissingAttendanceTable {
                partition: target.partition.clone(),
                sheet: sheet.to_string(),
            })?;

        let now = self.clock.now();
        let time = truncate_to_seconds(now.time());
        let base_col =
            locate_today_column(&header, layout.stride_start, layout.stride, now.date())
                .ok_or(CheckInError::NoDateColumn)?;
        debug!(partition = %target.partition, base_col, "located date column");

        let (offset, status) = match classify(time) {
            Classification::Skip => {
                info!(name = %target.name, time = %time, "inside skip window, nothing written");
                return Ok(CheckInOutcome::Skipped {
                    name: target.name,
                    class_code: target.class_code,
                    time,
                });
            }
            Classification::Mark { offset, status } => (offset, status),
        };

        let col = base_col + offset;
        self.store
            .write_cell(
                &target.partition,
                sheet,
                target.row,
                col,
                &Cell::text(status.code()),
            )
            .map_err(|e| CheckInError::from_store(&target.partition, e))?;

        info!(
            name = %target.name,
            partition = %target.partition,
            row = target.row,
            col,
            status = %status,
            "checked in"
        );
        Ok(CheckInOutcome::Recorded {
            name: target.name,
            class_code: target.class_code,
            time,
            partition: target.partition,
            row: target.row,
            col,
            status,
        })
    }

    pub fn rebuild_index(&self) -> Result<RebuildSummary, CheckInError> {
        let build = self.builder().build(self.clock.now());
        let skipped = build.skipped.clone();
        let collisions = build.collisions;
        let index = self.cache.put(build)?;
        Ok(RebuildSummary {
            index,
            skipped,
            collisions,
        })
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate();
    }

    pub fn classes(&self) -> &[ClassPartition] {
        self.config.registry.list_classes()
    }

    pub fn scan_codes(&self, class_code: &str) -> Result<Vec<ScanCode>, CheckInError> {
        scan_codes(
            self.store.as_ref(),
            &self.config.registry,
            &self.config.layout,
            class_code,
        )
    }
}

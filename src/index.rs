//! Reverse index from a normalized full name to the row that holds that
//! person's attendance.
//!
//! A build scans the attendance sheet of every configured partition. Rows
//! count as students only when their number cell holds a positive integer,
//! which filters out titles, header rows, separators and blank lines without
//! knowing the sheet's exact shape. Partitions that cannot be read are logged
//! and skipped so that one broken class does not take the whole index down.
//!
//! Two people whose names fold to the same key collide: the one scanned last
//! wins. Collisions are counted and logged but not resolved.

use crate::config::SheetLayout;
use crate::normalize::normalize;
use crate::registry::PartitionRegistry;
use crate::store::{Cell, PartitionStore};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub partition: String,
    pub row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameIndex {
    pub build_id: Uuid,
    pub built_at: NaiveDateTime,
    pub fingerprint: String,
    pub record_count: usize,
    pub entries: HashMap<String, IndexEntry>,
}

impl NameIndex {
    pub fn lookup(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPartition {
    pub class_code: String,
    pub partition: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IndexBuild {
    pub index: NameIndex,
    pub skipped: Vec<SkippedPartition>,
    pub collisions: usize,
}

/// A student row as read from an attendance sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub number: i64,
    /// 1-based sheet row.
    pub row: usize,
    pub full_name: String,
}

/// Positive whole numbers only; text such as "1" does not count.
pub fn student_number(cell: Option<&Cell>) -> Option<i64> {
    match cell {
        Some(Cell::Number(n)) if n.is_finite() && n.fract() == 0.0 && *n >= 1.0 => {
            Some(*n as i64)
        }
        _ => None,
    }
}

/// Joins the non-empty name parts with single spaces.
pub fn compose_full_name<'a>(parts: impl IntoIterator<Item = &'a Cell>) -> String {
    parts
        .into_iter()
        .map(|c| c.as_display().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Valid student records of one sheet, in row order.
pub fn student_records(rows: &[Vec<Cell>], layout: &SheetLayout) -> Vec<StudentRecord> {
    let mut out = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let Some(number) = student_number(row.get(layout.student_number_column)) else {
            continue;
        };
        let full_name =
            compose_full_name(layout.name_columns.iter().filter_map(|c| row.get(*c)));
        if full_name.is_empty() {
            continue;
        }
        out.push(StudentRecord {
            number,
            row: i + 1,
            full_name,
        });
    }
    out
}

pub struct IndexBuilder<'a> {
    store: &'a dyn PartitionStore,
    registry: &'a PartitionRegistry,
    layout: &'a SheetLayout,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        store: &'a dyn PartitionStore,
        registry: &'a PartitionRegistry,
        layout: &'a SheetLayout,
    ) -> Self {
        Self {
            store,
            registry,
            layout,
        }
    }

    /// Hex SHA-256 over the registry fingerprint and every layout field that
    /// decides which row a name maps to. Header and date-stride settings are
    /// read at check-in time and stay out of it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.registry.fingerprint().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.layout.attendance_sheet.as_bytes());
        hasher.update([0u8]);
        hasher.update((self.layout.student_number_column as u64).to_le_bytes());
        for col in &self.layout.name_columns {
            hasher.update((*col as u64).to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn build(&self, now: NaiveDateTime) -> IndexBuild {
        let sheet = self.layout.attendance_sheet.as_str();
        let mut entries: HashMap<String, IndexEntry> = HashMap::new();
        let mut skipped = Vec::new();
        let mut record_count = 0usize;
        let mut collisions = 0usize;

        for class in self.registry.list_classes() {
            let rows = match self.store.read_rows(&class.partition, sheet) {
                Ok(Some(rows)) => rows,
                Ok(None) => {
                    warn!(
                        partition = %class.partition,
                        "sheet {sheet:?} missing, skipping class {}",
                        class.class_code
                    );
                    skipped.push(SkippedPartition {
                        class_code: class.class_code.clone(),
                        partition: class.partition.clone(),
                        reason: format!("sheet {sheet:?} not found"),
                    });
                    continue;
                }
                Err(e) => {
                    warn!(
                        partition = %class.partition,
                        "partition unreadable, skipping class {}: {e}",
                        class.class_code
                    );
                    skipped.push(SkippedPartition {
                        class_code: class.class_code.clone(),
                        partition: class.partition.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let records = student_records(&rows, self.layout);
            debug!(
                partition = %class.partition,
                records = records.len(),
                "scanned class {}",
                class.class_code
            );
            for rec in records {
                let key = normalize(&rec.full_name);
                if key.is_empty() {
                    continue;
                }
                record_count += 1;
                let entry = IndexEntry {
                    partition: class.partition.clone(),
                    row: rec.row,
                };
                if let Some(prev) = entries.insert(key.clone(), entry) {
                    collisions += 1;
                    warn!(
                        key = %key,
                        "name collision: {}:{} replaced by {}:{}",
                        prev.partition,
                        prev.row,
                        class.partition,
                        rec.row
                    );
                }
            }
        }

        let index = NameIndex {
            build_id: Uuid::new_v4(),
            built_at: now,
            fingerprint: self.fingerprint(),
            record_count,
            entries,
        };
        info!(
            build_id = %index.build_id,
            entries = index.len(),
            records = record_count,
            skipped = skipped.len(),
            "name index built"
        );
        IndexBuild {
            index,
            skipped,
            collisions,
        }
    }
}

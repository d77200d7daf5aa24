use crate::registry::{derive_class_label, ClassPartition, PartitionRegistry};
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "rollcall.json";

/// Where things live inside every partition's attendance sheet.
/// Columns here are 0-based offsets into a row; `header_row` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub attendance_sheet: String,
    pub header_row: usize,
    pub stride_start: usize,
    pub stride: usize,
    pub student_number_column: usize,
    pub name_columns: Vec<usize>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            attendance_sheet: "Attendance".to_string(),
            header_row: 9,
            stride_start: 4,
            stride: 2,
            student_number_column: 0,
            name_columns: vec![1, 2, 3],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub layout: SheetLayout,
    pub registry: PartitionRegistry,
    pub cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            registry: PartitionRegistry::default(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

const DEFAULT_CACHE_TTL_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    attendance_sheet: Option<String>,
    header_row: Option<usize>,
    stride_start: Option<usize>,
    stride: Option<usize>,
    student_number_column: Option<usize>,
    name_columns: Option<Vec<usize>>,
    cache_ttl_seconds: Option<u64>,
    classes: Vec<RawClass>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClass {
    #[serde(default)]
    code: Option<String>,
    partition: String,
    #[serde(default)]
    link: Option<String>,
}

impl AppConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let raw: RawConfig = serde_json::from_str(text).context("config is invalid JSON")?;
        let defaults = SheetLayout::default();
        let layout = SheetLayout {
            attendance_sheet: raw
                .attendance_sheet
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.attendance_sheet),
            header_row: raw.header_row.unwrap_or(defaults.header_row),
            stride_start: raw.stride_start.unwrap_or(defaults.stride_start),
            stride: raw.stride.unwrap_or(defaults.stride),
            student_number_column: raw
                .student_number_column
                .unwrap_or(defaults.student_number_column),
            name_columns: raw.name_columns.unwrap_or(defaults.name_columns),
        };
        if layout.header_row == 0 {
            anyhow::bail!("headerRow is 1-based and must be at least 1");
        }
        if layout.stride == 0 {
            anyhow::bail!("stride must be at least 1");
        }
        if layout.name_columns.is_empty() {
            anyhow::bail!("nameColumns must list at least one column");
        }

        let mut entries = Vec::with_capacity(raw.classes.len());
        for c in raw.classes {
            let partition = c.partition.trim().to_string();
            if partition.is_empty() {
                anyhow::bail!("class entry with empty partition");
            }
            let class_code = match c.code.map(|s| s.trim().to_string()) {
                Some(code) if !code.is_empty() => code,
                _ => derive_class_label(&partition),
            };
            entries.push(ClassPartition {
                class_code,
                partition,
                link: c.link.filter(|l| !l.trim().is_empty()),
            });
        }
        let registry = PartitionRegistry::new(entries)?;

        Ok(Self {
            layout,
            registry,
            cache_ttl: Duration::from_secs(raw.cache_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        })
    }

    /// Reads `path`, or falls back to defaults (no classes) when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            warn!(
                "config {} not found, using defaults with no classes",
                path.to_string_lossy()
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        let cfg = Self::from_json(&text)
            .with_context(|| format!("invalid config {}", path.to_string_lossy()))?;
        info!(
            classes = cfg.registry.list_classes().len(),
            sheet = %cfg.layout.attendance_sheet,
            "loaded config {}",
            path.to_string_lossy()
        );
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = AppConfig::from_json("{}").expect("parse");
        assert_eq!(cfg.layout, SheetLayout::default());
        assert_eq!(cfg.cache_ttl, Duration::from_secs(21600));
        assert!(cfg.registry.is_empty());
    }

    #[test]
    fn class_codes_fall_back_to_legacy_labels() {
        let cfg = AppConfig::from_json(
            r#"{
                "attendanceSheet": "DiemDanh",
                "headerRow": 3,
                "classes": [
                    { "code": "c1", "partition": "P-CHIEN-1", "link": "https://example.invalid/c1" },
                    { "partition": "Ấu 2" }
                ]
            }"#,
        )
        .expect("parse");
        assert_eq!(cfg.layout.attendance_sheet, "DiemDanh");
        assert_eq!(cfg.layout.header_row, 3);
        assert_eq!(cfg.registry.resolve_partition("c1"), Some("P-CHIEN-1"));
        assert_eq!(cfg.registry.resolve_partition("a2"), Some("Ấu 2"));
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        assert!(AppConfig::from_json(r#"{ "headerRow": 0 }"#).is_err());
        assert!(AppConfig::from_json(r#"{ "stride": 0 }"#).is_err());
        assert!(AppConfig::from_json(
            r#"{ "classes": [{ "code": "c1", "partition": "A" }, { "code": "c1", "partition": "B" }] }"#
        )
        .is_err());
    }
}

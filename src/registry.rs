use crate::normalize::normalize;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPartition {
    pub class_code: String,
    pub partition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Static class code -> partition mapping, fixed once the workspace is open.
#[derive(Debug, Clone, Default)]
pub struct PartitionRegistry {
    entries: Vec<ClassPartition>,
}

impl PartitionRegistry {
    pub fn new(entries: Vec<ClassPartition>) -> anyhow::Result<Self> {
        for (i, e) in entries.iter().enumerate() {
            if e.class_code.is_empty() {
                anyhow::bail!("class code for partition {:?} is empty", e.partition);
            }
            if entries[..i].iter().any(|p| p.class_code == e.class_code) {
                anyhow::bail!("duplicate class code {:?}", e.class_code);
            }
        }
        Ok(Self { entries })
    }

    pub fn resolve_partition(&self, class_code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.class_code == class_code)
            .map(|e| e.partition.as_str())
    }

    pub fn class_for_partition(&self, partition: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.partition == partition)
            .map(|e| e.class_code.as_str())
    }

    pub fn list_classes(&self) -> &[ClassPartition] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex SHA-256 over the ordered (code, partition) pairs. A persisted index
    /// built under a different registry is not reused.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for e in &self.entries {
            hasher.update(e.class_code.as_bytes());
            hasher.update([0u8]);
            hasher.update(e.partition.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Legacy class label: accent-free first and last character of the
/// partition name, e.g. "Chiên 1" -> "c1".
pub fn derive_class_label(partition_name: &str) -> String {
    let t = partition_name.trim();
    let (Some(first), Some(last)) = (t.chars().next(), t.chars().last()) else {
        return String::new();
    };
    let mut out = normalize(&first.to_string());
    out.push_str(&normalize(&last.to_string()));
    out
}

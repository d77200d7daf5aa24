use crate::error::CheckInError;
use crate::index::NameIndex;
use crate::normalize::normalize;
use crate::registry::PartitionRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInput {
    /// Name tokens re-joined with single spaces.
    pub name: String,
    pub class_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub class_code: String,
    pub partition: String,
    pub row: usize,
}

/// Splits `"<name tokens> <classCode>"`; the final token is always the class.
pub fn split_scan(raw: &str) -> Result<ScanInput, CheckInError> {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(CheckInError::MalformedInput(raw.trim().to_string()));
    }
    let class_code = tokens.pop().unwrap_or_default().to_string();
    Ok(ScanInput {
        name: tokens.join(" "),
        class_code,
    })
}

/// Resolves a scan to the row it should be written to.
///
/// `claimed_class` is only used for a single-token scan (a bare name); the
/// embedded class token wins otherwise.
pub fn resolve(
    index: &NameIndex,
    registry: &PartitionRegistry,
    raw: &str,
    claimed_class: Option<&str>,
) -> Result<Resolution, CheckInError> {
    let scan = match (split_scan(raw), claimed_class) {
        (Ok(scan), _) => scan,
        (Err(_), Some(code)) if !raw.trim().is_empty() && !code.trim().is_empty() => ScanInput {
            name: raw.split_whitespace().collect::<Vec<_>>().join(" "),
            class_code: code.trim().to_string(),
        },
        (Err(e), _) => return Err(e),
    };

    let key = normalize(&scan.name);
    let Some(entry) = index.lookup(&key) else {
        return Err(CheckInError::NameNotFound(scan.name));
    };

    if registry.resolve_partition(&scan.class_code) != Some(entry.partition.as_str()) {
        let expected = registry
            .class_for_partition(&entry.partition)
            .unwrap_or(entry.partition.as_str())
            .to_string();
        return Err(CheckInError::ClassMismatch {
            name: scan.name,
            expected,
            claimed: scan.class_code,
        });
    }

    Ok(Resolution {
        name: scan.name,
        class_code: scan.class_code,
        partition: entry.partition.clone(),
        row: entry.row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::registry::ClassPartition;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn fixture() -> (NameIndex, PartitionRegistry) {
        let mut entries = HashMap::new();
        entries.insert(
            "giusetranhoangnguyenkhoi".to_string(),
            IndexEntry {
                partition: "P-C1".to_string(),
                row: 5,
            },
        );
        let index = NameIndex {
            build_id: Uuid::new_v4(),
            built_at: chrono::NaiveDate::from_ymd_opt(2025, 7, 10)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .expect("timestamp"),
            fingerprint: String::new(),
            record_count: 1,
            entries,
        };
        let registry = PartitionRegistry::new(vec![
            ClassPartition {
                class_code: "c1".to_string(),
                partition: "P-C1".to_string(),
                link: None,
            },
            ClassPartition {
                class_code: "c2".to_string(),
                partition: "P-C2".to_string(),
                link: None,
            },
        ])
        .expect("registry");
        (index, registry)
    }

    #[test]
    fn split_takes_last_token_as_class() {
        let scan = split_scan(" Giuse Trần  Hoàng   Nguyên Khôi c1 ").expect("split");
        assert_eq!(scan.name, "Giuse Trần Hoàng Nguyên Khôi");
        assert_eq!(scan.class_code, "c1");
    }

    #[test]
    fn split_rejects_single_token_and_blank() {
        assert!(matches!(split_scan("c1"), Err(CheckInError::MalformedInput(_))));
        assert!(matches!(split_scan("   "), Err(CheckInError::MalformedInput(_))));
    }

    #[test]
    fn resolves_accented_scan_to_row() {
        let (index, registry) = fixture();
        let res = resolve(&index, &registry, "Giuse Trần Hoàng Nguyên Khôi c1", None)
            .expect("resolve");
        assert_eq!(res.partition, "P-C1");
        assert_eq!(res.row, 5);
        assert_eq!(res.class_code, "c1");
    }

    #[test]
    fn embedded_class_overrides_supplied_one() {
        let (index, registry) = fixture();
        let res = resolve(&index, &registry, "Giuse Tran Hoang Nguyen Khoi c1", Some("c2"))
            .expect("resolve");
        assert_eq!(res.class_code, "c1");
    }

    #[test]
    fn single_token_scan_uses_supplied_class() {
        let (mut index, registry) = fixture();
        index.entries.insert(
            "khoi".to_string(),
            IndexEntry {
                partition: "P-C1".to_string(),
                row: 7,
            },
        );

        let res = resolve(&index, &registry, " Khôi ", Some(" c1 ")).expect("resolve");
        assert_eq!(res.name, "Khôi");
        assert_eq!(res.class_code, "c1");
        assert_eq!(res.partition, "P-C1");
        assert_eq!(res.row, 7);

        let err = resolve(&index, &registry, "Khoi", Some("c2")).expect_err("mismatch");
        match err {
            CheckInError::ClassMismatch {
                name,
                expected,
                claimed,
            } => {
                assert_eq!(name, "Khoi");
                assert_eq!(expected, "c1");
                assert_eq!(claimed, "c2");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            resolve(&index, &registry, "Khoi", None),
            Err(CheckInError::MalformedInput(_))
        ));
        assert!(matches!(
            resolve(&index, &registry, "Khoi", Some("  ")),
            Err(CheckInError::MalformedInput(_))
        ));
    }

    #[test]
    fn wrong_class_is_a_mismatch_not_a_miss() {
        let (index, registry) = fixture();
        let err = resolve(&index, &registry, "Giuse Tran Hoang Nguyen Khoi c2", None)
            .expect_err("mismatch");
        match err {
            CheckInError::ClassMismatch {
                expected, claimed, ..
            } => {
                assert_eq!(expected, "c1");
                assert_eq!(claimed, "c2");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = resolve(&index, &registry, "Giuse Tran Hoang Nguyen Khoi zz", None)
            .expect_err("unknown class");
        assert!(matches!(err, CheckInError::ClassMismatch { .. }));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let (index, registry) = fixture();
        let err = resolve(&index, &registry, "Maria Le An c1", None).expect_err("miss");
        assert!(matches!(err, CheckInError::NameNotFound(ref n) if n == "Maria Le An"));
    }
}

use crate::config::SheetLayout;
use crate::error::CheckInError;
use crate::index::student_records;
use crate::registry::PartitionRegistry;
use crate::store::PartitionStore;
use serde::Serialize;

/// What a student's printed card encodes: the string the scanner submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCode {
    pub number: i64,
    pub row: usize,
    pub name: String,
    pub payload: String,
}

pub fn scan_codes(
    store: &dyn PartitionStore,
    registry: &PartitionRegistry,
    layout: &SheetLayout,
    class_code: &str,
) -> Result<Vec<ScanCode>, CheckInError> {
    let Some(partition) = registry.resolve_partition(class_code) else {
        return Err(CheckInError::UnknownClass(class_code.to_string()));
    };
    let rows = store
        .read_rows(partition, &layout.attendance_sheet)
        .map_err(|e| CheckInError::from_store(partition, e))?
        .ok_or_else(|| CheckInError::MissingAttendanceTable {
            partition: partition.to_string(),
            sheet: layout.attendance_sheet.clone(),
        })?;

    Ok(student_records(&rows, layout)
        .into_iter()
        .map(|rec| {
            // Collapse inner runs (including no-break spaces) so the payload
            // splits back into exactly these tokens.
            let name = rec.full_name.split_whitespace().collect::<Vec<_>>().join(" ");
            let payload = format!("{} {}", name, class_code);
            ScanCode {
                number: rec.number,
                row: rec.row,
                name,
                payload,
            }
        })
        .collect())
}

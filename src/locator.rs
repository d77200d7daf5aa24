use crate::store::Cell;
use chrono::NaiveDate;

/// Finds the 1-based column of the first header date on or after `today`.
///
/// Only every `stride`-th cell from the 0-based `stride_start` is looked at.
/// Cells there that are not dates are skipped and the scan goes on. Dates are
/// compared by calendar day, so a time-of-day in the header never matters.
/// Dates are assumed non-decreasing; if they are not, the first qualifying
/// one in column order still wins.
pub fn locate_today_column(
    header: &[Cell],
    stride_start: usize,
    stride: usize,
    today: NaiveDate,
) -> Option<usize> {
    header
        .iter()
        .enumerate()
        .skip(stride_start)
        .step_by(stride.max(1))
        .find_map(|(idx, cell)| match cell {
            Cell::Date(d) if d.date() >= today => Some(idx + 1),
            _ => None,
        })
}

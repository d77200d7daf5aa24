use chrono::{NaiveTime, Timelike};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Present (on time, or any arrival in the late slot before noon).
    Present,
    /// Tardy: 09:00 up to 09:10.
    Tardy,
    /// Late-slot arrival from noon on.
    Afternoon,
}

impl Status {
    pub fn code(self) -> &'static str {
        match self {
            Status::Present => "X",
            Status::Tardy => "T",
            Status::Afternoon => "O",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Write `status` at base column + `offset`.
    Mark { offset: usize, status: Status },
    /// Inside the 09:10-10:00 window: write nothing.
    Skip,
}

fn hms(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// Drops sub-second precision so comparisons match `HH:MM:SS` text.
pub fn truncate_to_seconds(t: NaiveTime) -> NaiveTime {
    t.with_nanosecond(0).unwrap_or(t)
}

pub fn classify(time: NaiveTime) -> Classification {
    let t = truncate_to_seconds(time);
    let tardy_from = hms(9, 0);
    let skip_from = hms(9, 10);
    let late_slot_from = hms(10, 0);
    let noon = hms(12, 0);

    if t >= skip_from && t < late_slot_from {
        return Classification::Skip;
    }
    if t < tardy_from {
        return Classification::Mark {
            offset: 0,
            status: Status::Present,
        };
    }
    if t < skip_from {
        return Classification::Mark {
            offset: 0,
            status: Status::Tardy,
        };
    }
    Classification::Mark {
        offset: 1,
        status: if t < noon {
            Status::Present
        } else {
            Status::Afternoon
        },
    }
}

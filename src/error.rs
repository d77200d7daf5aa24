use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("partition {0:?} is not available in this workspace")]
    UnknownPartition(String),

    #[error("sheet {sheet:?} not found in partition {partition:?}")]
    MissingSheet { partition: String, sheet: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed stored value: {0}")]
    Codec(String),
}

/// Everything a check-in can fail with. Only `checkin::render` turns these
/// into text.
#[derive(Error, Debug)]
pub enum CheckInError {
    #[error("Malformed scan {0:?}; expected \"<name> <classCode>\".")]
    MalformedInput(String),

    #[error("\"{0}\" not found in index.")]
    NameNotFound(String),

    #[error("\"{name}\" belongs to {expected}, not {claimed}.")]
    ClassMismatch {
        name: String,
        expected: String,
        claimed: String,
    },

    #[error("Partition \"{partition}\" could not be read: {reason}")]
    PartitionUnreachable { partition: String, reason: String },

    #[error("Sheet \"{sheet}\" not found in partition \"{partition}\".")]
    MissingAttendanceTable { partition: String, sheet: String },

    #[error("No matching column for today's date.")]
    NoDateColumn,

    #[error("Name index could not be loaded.")]
    IndexUnavailable,

    #[error("Class \"{0}\" is not configured.")]
    UnknownClass(String),

    #[error("Storage failure: {0}")]
    Store(StoreError),
}

impl CheckInError {
    pub fn code(&self) -> &'static str {
        match self {
            CheckInError::MalformedInput(_) => "malformed_input",
            CheckInError::NameNotFound(_) => "name_not_found",
            CheckInError::ClassMismatch { .. } => "class_mismatch",
            CheckInError::PartitionUnreachable { .. } => "partition_unreachable",
            CheckInError::MissingAttendanceTable { .. } => "missing_attendance_table",
            CheckInError::NoDateColumn => "no_date_column",
            CheckInError::IndexUnavailable => "index_unavailable",
            CheckInError::UnknownClass(_) => "unknown_class",
            CheckInError::Store(_) => "store_failed",
        }
    }

    /// Maps a store failure against `partition` onto the check-in taxonomy.
    pub fn from_store(partition: &str, e: StoreError) -> Self {
        match e {
            StoreError::MissingSheet { partition, sheet } => {
                CheckInError::MissingAttendanceTable { partition, sheet }
            }
            StoreError::UnknownPartition(_) | StoreError::Sqlite(_) => {
                CheckInError::PartitionUnreachable {
                    partition: partition.to_string(),
                    reason: e.to_string(),
                }
            }
            StoreError::Codec(_) => CheckInError::Store(e),
        }
    }
}

use crate::error::StoreError;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One spreadsheet-style cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Display form used when composing names from cells.
    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    fn encode(&self) -> Option<(&'static str, String)> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(("number", n.to_string())),
            Cell::Text(s) => Some(("text", s.clone())),
            Cell::Date(d) => Some(("date", d.format(DATE_FORMAT).to_string())),
        }
    }

    fn decode(kind: &str, value: &str) -> Result<Self, StoreError> {
        match kind {
            "number" => value
                .parse::<f64>()
                .map(Cell::Number)
                .map_err(|e| StoreError::Codec(format!("number {:?}: {}", value, e))),
            "text" => Ok(Cell::Text(value.to_string())),
            "date" => NaiveDateTime::parse_from_str(value, DATE_FORMAT)
                .map(Cell::Date)
                .map_err(|e| StoreError::Codec(format!("date {:?}: {}", value, e))),
            other => Err(StoreError::Codec(format!("unknown cell kind {:?}", other))),
        }
    }
}

/// The external tabular store holding each class's attendance sheet.
/// Rows and columns are 1-based at this boundary.
pub trait PartitionStore {
    /// Every row of the sheet, padded to the sheet's last used column.
    /// `Ok(None)` when the partition exists but the sheet does not.
    fn read_rows(&self, partition: &str, sheet: &str)
        -> Result<Option<Vec<Vec<Cell>>>, StoreError>;

    fn read_row(
        &self,
        partition: &str,
        sheet: &str,
        row: usize,
    ) -> Result<Option<Vec<Cell>>, StoreError>;

    fn write_cell(
        &self,
        partition: &str,
        sheet: &str,
        row: usize,
        col: usize,
        cell: &Cell,
    ) -> Result<(), StoreError>;

    fn replace_sheet(
        &self,
        partition: &str,
        sheet: &str,
        rows: &[Vec<Cell>],
    ) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn check_sheet(&self, partition: &str, sheet: &str) -> Result<bool, StoreError> {
        let known = self
            .conn
            .query_row("SELECT 1 FROM partitions WHERE id = ?", [partition], |r| {
                r.get::<_, i64>(0)
            })
            .optional()?
            .is_some();
        if !known {
            return Err(StoreError::UnknownPartition(partition.to_string()));
        }
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM sheets WHERE partition_id = ? AND name = ?",
                (partition, sheet),
                |r| r.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    fn last_column(&self, partition: &str, sheet: &str) -> Result<usize, StoreError> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(col) FROM cells WHERE partition_id = ? AND sheet_name = ?",
            (partition, sheet),
            |r| r.get(0),
        )?;
        Ok(max.unwrap_or(0).max(0) as usize)
    }
}

fn place(row: &mut Vec<Cell>, col: usize, cell: Cell) {
    if col == 0 {
        return;
    }
    if row.len() < col {
        row.resize(col, Cell::Empty);
    }
    row[col - 1] = cell;
}

impl PartitionStore for SqliteStore {
    fn read_rows(
        &self,
        partition: &str,
        sheet: &str,
    ) -> Result<Option<Vec<Vec<Cell>>>, StoreError> {
        if !self.check_sheet(partition, sheet)? {
            return Ok(None);
        }
        let width = self.last_column(partition, sheet)?;
        let mut stmt = self.conn.prepare(
            "SELECT row, col, kind, value
             FROM cells
             WHERE partition_id = ? AND sheet_name = ?
             ORDER BY row, col",
        )?;
        let raw = stmt
            .query_map((partition, sheet), |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for (row, col, kind, value) in raw {
            if row < 1 || col < 1 {
                continue;
            }
            let (row, col) = (row as usize, col as usize);
            while rows.len() < row {
                rows.push(vec![Cell::Empty; width]);
            }
            place(&mut rows[row - 1], col, Cell::decode(&kind, &value)?);
        }
        Ok(Some(rows))
    }

    fn read_row(
        &self,
        partition: &str,
        sheet: &str,
        row: usize,
    ) -> Result<Option<Vec<Cell>>, StoreError> {
        if !self.check_sheet(partition, sheet)? {
            return Ok(None);
        }
        let width = self.last_column(partition, sheet)?;
        let mut out = vec![Cell::Empty; width];
        let mut stmt = self.conn.prepare(
            "SELECT col, kind, value
             FROM cells
             WHERE partition_id = ? AND sheet_name = ? AND row = ?
             ORDER BY col",
        )?;
        let raw = stmt
            .query_map((partition, sheet, row as i64), |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
        for (col, kind, value) in raw {
            if col < 1 {
                continue;
            }
            place(&mut out, col as usize, Cell::decode(&kind, &value)?);
        }
        Ok(Some(out))
    }

    fn write_cell(
        &self,
        partition: &str,
        sheet: &str,
        row: usize,
        col: usize,
        cell: &Cell,
    ) -> Result<(), StoreError> {
        if !self.check_sheet(partition, sheet)? {
            return Err(StoreError::MissingSheet {
                partition: partition.to_string(),
                sheet: sheet.to_string(),
            });
        }
        match cell.encode() {
            Some((kind, value)) => {
                self.conn.execute(
                    "INSERT INTO cells(partition_id, sheet_name, row, col, kind, value)
                     VALUES(?, ?, ?, ?, ?, ?)
                     ON CONFLICT(partition_id, sheet_name, row, col) DO UPDATE SET
                       kind = excluded.kind,
                       value = excluded.value",
                    (partition, sheet, row as i64, col as i64, kind, &value),
                )?;
            }
            None => {
                self.conn.execute(
                    "DELETE FROM cells
                     WHERE partition_id = ? AND sheet_name = ? AND row = ? AND col = ?",
                    (partition, sheet, row as i64, col as i64),
                )?;
            }
        }
        Ok(())
    }

    fn replace_sheet(
        &self,
        partition: &str,
        sheet: &str,
        rows: &[Vec<Cell>],
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO partitions(id) VALUES(?)",
            [partition],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO sheets(partition_id, name) VALUES(?, ?)",
            (partition, sheet),
        )?;
        tx.execute(
            "DELETE FROM cells WHERE partition_id = ? AND sheet_name = ?",
            (partition, sheet),
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cells(partition_id, sheet_name, row, col, kind, value)
                 VALUES(?, ?, ?, ?, ?, ?)",
            )?;
            for (ri, row) in rows.iter().enumerate() {
                for (ci, cell) in row.iter().enumerate() {
                    let Some((kind, value)) = cell.encode() else {
                        continue;
                    };
                    stmt.execute((
                        partition,
                        sheet,
                        (ri + 1) as i64,
                        (ci + 1) as i64,
                        kind,
                        &value,
                    ))?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

use anyhow::Context;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "rollcall.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let conn = Connection::open(db_path(workspace))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    // Store and cache keep separate connections on the same file.
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS partitions(
            id TEXT PRIMARY KEY
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheets(
            partition_id TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY(partition_id, name),
            FOREIGN KEY(partition_id) REFERENCES partitions(id)
        )",
        [],
    )?;

    // 1-based row/col, sparse: absent cells read back as empty.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cells(
            partition_id TEXT NOT NULL,
            sheet_name TEXT NOT NULL,
            row INTEGER NOT NULL,
            col INTEGER NOT NULL,
            kind TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY(partition_id, sheet_name, row, col),
            FOREIGN KEY(partition_id, sheet_name) REFERENCES sheets(partition_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cells_sheet_row ON cells(partition_id, sheet_name, row)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

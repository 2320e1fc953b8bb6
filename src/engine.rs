//! The SQL engine the loader feeds, and the SQLite workspace backing it.
//!
//! [`SqlEngine`] is the only surface the loader and runner talk to. The
//! bundled implementation, [`SqliteEngine`], keeps its database in a private
//! temporary directory that is deleted when the engine is dropped, so the
//! workspace is released on every exit path.

use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{Connection, functions::FunctionFlags, types::ValueRef};
use tempfile::TempDir;

use crate::error::EngineError;

const WORKSPACE_PREFIX: &str = "csv_query_db_";
const DATABASE_FILE: &str = "csv.db";

/// Column names plus rows, NULL cells as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

pub trait SqlEngine {
    /// Runs one statement that returns no rows.
    fn execute(&mut self, sql: &str) -> Result<(), EngineError>;

    /// Runs one statement and collects every row it returns.
    fn query(&mut self, sql: &str) -> Result<QueryResult, EngineError>;
}

pub struct SqliteEngine {
    conn: Connection,
    location: Option<PathBuf>,
    workspace: Option<TempDir>,
}

impl SqliteEngine {
    /// Opens a database inside a fresh temporary directory.
    pub fn open_workspace() -> Result<Self, EngineError> {
        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        let path = workspace.path().join(DATABASE_FILE);
        let conn = Connection::open(&path)?;
        info!("Opened SQL workspace {}", workspace.path().display());
        Self::configure(conn, Some(path), Some(workspace))
    }

    /// Opens (or creates) a database at a caller-owned path. Nothing is
    /// deleted on drop.
    pub fn open_path(path: &Path) -> Result<Self, EngineError> {
        let conn = Connection::open(path)?;
        Self::configure(conn, Some(path.to_path_buf()), None)
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::configure(Connection::open_in_memory()?, None, None)
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Removes a table left behind by an earlier run against the same file.
    pub fn drop_table(&mut self, table: &str) -> Result<(), EngineError> {
        debug!("Dropping table {table} if it exists");
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        Ok(())
    }

    fn configure(
        conn: Connection,
        location: Option<PathBuf>,
        workspace: Option<TempDir>,
    ) -> Result<Self, EngineError> {
        // The loaded data is disposable; skip journaling entirely.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "OFF", |row| row.get(0))?;
        debug!("SQLite journal_mode set to {mode}");
        conn.pragma_update(None, "synchronous", "OFF")?;
        register_functions(&conn)?;
        Ok(Self {
            conn,
            location,
            workspace,
        })
    }
}

impl SqlEngine for SqliteEngine {
    fn execute(&mut self, sql: &str) -> Result<(), EngineError> {
        self.conn.execute(sql, [])?;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, EngineError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(render_cell(row.get_ref(idx)?));
            }
            rows.push(cells);
        }
        Ok(QueryResult { columns, rows })
    }
}

impl Drop for SqliteEngine {
    fn drop(&mut self) {
        if let Some(workspace) = &self.workspace {
            info!("Releasing SQL workspace {}", workspace.path().display());
        }
    }
}

fn render_cell(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// `tof(s)`: number from text using either `.` or `,` as decimal separator.
/// `toyyyymmdd(s)`: rearranges `dd/mm/yyyy` into `yyyy-mm-dd`.
fn register_functions(conn: &Connection) -> Result<(), EngineError> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("tof", 1, flags, |ctx| Ok(to_float(ctx.get_raw(0))))?;
    conn.create_scalar_function("toyyyymmdd", 1, flags, |ctx| {
        Ok(match ctx.get_raw(0) {
            ValueRef::Null => None,
            other => render_cell(other).map(|text| simple_to_sql_date(&text)),
        })
    })?;
    Ok(())
}

fn to_float(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()?
            .trim()
            .replace(',', ".")
            .parse()
            .ok(),
        _ => None,
    }
}

fn simple_to_sql_date(value: &str) -> String {
    let chars = value.chars().collect::<Vec<_>>();
    let slice = |start: usize, len: usize| -> String {
        chars.iter().skip(start).take(len).collect()
    };
    format!("{}-{}-{}", slice(6, 4), slice(3, 2), slice(0, 2))
}

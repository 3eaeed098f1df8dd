//! The working SQLite database behind an open collection.
//!
//! [`SchemaStore`] owns the connection and resolves the schema
//! [`Generation`] once when the database is mounted. Repositories borrow it
//! and never probe table layout themselves.

mod schema;
pub mod scratch;

use std::fmt;
use std::path::Path;

use rusqlite::backup::Progress;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, DatabaseName, Row, params};
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApkgError, Result};

pub use scratch::Scratch;

/// How decks are stored in a mounted database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Generation {
    /// A dedicated `decks` table exists.
    TypedTables,
    /// Decks live in the `col.decks` JSON object.
    LegacyJson,
}

impl Generation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypedTables => "typed-tables",
            Self::LegacyJson => "legacy-json",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-valued columns of the `col` row that repositories read and rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColBlob {
    Models,
    Decks,
}

impl ColBlob {
    const fn column(self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Decks => "decks",
        }
    }
}

/// Owned connection plus the resources backing it.
pub struct SchemaStore {
    conn: Connection,
    generation: Generation,
    scratch: Scratch,
    // Dropped after `conn`, so the database file outlives its connection.
    workdir: Option<TempDir>,
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("generation", &self.generation)
            .field("workdir", &self.workdir.as_ref().map(TempDir::path))
            .finish_non_exhaustive()
    }
}

impl SchemaStore {
    /// Create an empty in-memory collection with the typed-table schema.
    #[instrument(skip(scratch))]
    pub fn create(scratch: Scratch) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ApkgError::Persistence(format!("Failed to open in-memory database: {e}")))?;
        init_schema(&conn)?;
        Self::mount(conn, scratch, None)
    }

    /// Copy the database file at `path` into an in-memory connection.
    ///
    /// The file is not referenced after this returns.
    #[instrument(skip(scratch), fields(path = %path.display()))]
    pub fn restore_from(path: &Path, scratch: Scratch) -> Result<Self> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| ApkgError::Persistence(format!("Failed to open in-memory database: {e}")))?;
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
            .map_err(|e| {
                ApkgError::InvalidContainer(format!("Database member is not a SQLite database: {e}"))
            })?;
        debug!("Restored database into memory");
        Self::mount(conn, scratch, None)
    }

    /// Open the database file at `path` in place.
    ///
    /// `workdir` holds the file and is removed when the store goes away.
    #[instrument(skip(workdir, scratch), fields(path = %path.display()))]
    pub fn open_file(path: &Path, workdir: TempDir, scratch: Scratch) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| ApkgError::Storage(format!("Failed to open scratch database: {e}")))?;
        Self::mount(conn, scratch, Some(workdir))
    }

    fn mount(conn: Connection, scratch: Scratch, workdir: Option<TempDir>) -> Result<Self> {
        let generation = detect_generation(&conn)?;
        info!(%generation, "Mounted collection database");
        Ok(Self {
            conn,
            generation,
            scratch,
            workdir,
        })
    }

    pub const fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) const fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) const fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        table_exists(&self.conn, name)
    }

    /// Row count of one of the collection tables.
    pub(crate) fn count(&self, table: &'static str) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(|e| ApkgError::Persistence(format!("Failed to count {table}: {e}")))
    }

    /// Text of a JSON column of the `col` row; empty when the row is absent.
    pub(crate) fn col_json(&self, blob: ColBlob) -> Result<String> {
        let sql = format!("SELECT {} FROM col LIMIT 1", blob.column());
        match self.conn.query_row(&sql, [], |row| text_at(row, 0)) {
            Ok(text) => Ok(text),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(String::new()),
            Err(e) => Err(ApkgError::Persistence(format!(
                "Failed to read col.{}: {e}",
                blob.column()
            ))),
        }
    }

    pub(crate) fn set_col_json(&self, blob: ColBlob, value: &str) -> Result<()> {
        let sql = format!("UPDATE col SET {} = ?1", blob.column());
        let rows = self
            .conn
            .execute(&sql, params![value])
            .map_err(|e| {
                ApkgError::Persistence(format!("Failed to write col.{}: {e}", blob.column()))
            })?;
        if rows == 0 {
            return Err(ApkgError::Persistence(format!(
                "Failed to write col.{}: collection has no col row",
                blob.column()
            )));
        }
        Ok(())
    }

    /// Serialize the live database to bytes through the backup API.
    #[instrument(skip(self))]
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let file = self.scratch.file(".anki21")?;
        self.conn
            .backup(DatabaseName::Main, file.path(), None)
            .map_err(|e| ApkgError::Persistence(format!("Failed to snapshot database: {e}")))?;
        let bytes = std::fs::read(file.path())
            .map_err(|e| ApkgError::Storage(format!("Failed to read database snapshot: {e}")))?;
        debug!(bytes = bytes.len(), "Database snapshot taken");
        Ok(bytes)
    }

    /// Release the connection and scratch directory.
    ///
    /// Failures are logged, not returned.
    #[instrument(skip(self))]
    pub fn close(self) {
        let Self { conn, workdir, .. } = self;
        if let Err((_, e)) = conn.close() {
            warn!(error = %e, "Failed to close database connection");
        }
        if let Some(dir) = workdir {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::SCHEMA_SQL)
        .map_err(|e| ApkgError::Persistence(format!("Failed to initialize schema: {e}")))?;
    let now = chrono::Utc::now().timestamp();
    conn.execute(schema::INSERT_DEFAULT_COL, params![now, schema::SCHEMA_VERSION])
        .map_err(|e| ApkgError::Persistence(format!("Failed to insert col row: {e}")))?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
    .map_err(|e| ApkgError::InvalidContainer(format!("Database member is not readable: {e}")))
}

fn detect_generation(conn: &Connection) -> Result<Generation> {
    if !table_exists(conn, "col")? {
        return Err(ApkgError::InvalidContainer(
            "Database member has no col table".to_string(),
        ));
    }
    if table_exists(conn, "decks")? {
        Ok(Generation::TypedTables)
    } else {
        Ok(Generation::LegacyJson)
    }
}

/// Integer column, with NULL read as 0.
pub(crate) fn int_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or_default())
}

/// Text column, tolerating the numeric affinity of columns such as `sfld`.
pub(crate) fn text_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    })
}

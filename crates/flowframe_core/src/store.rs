//! Persistence collaborator for the serialized dashboard blob.
//!
//! # Responsibility
//! - Define the opaque key-value contract (`StateStore`) the dashboard
//!   persists through.
//! - Provide a SQLite-backed store and an in-process store.
//!
//! # Invariants
//! - Stores never interpret the blob; validation happens in `sanitize`.
//! - `SqliteStateStore` is only constructible over a migrated connection.
//!
//! # See also
//! - `db::open_db` for connection bootstrap.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Key the live dashboard blob is stored under.
pub const STORAGE_KEY: &str = "flowframe-state-v1";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from state store reads and writes.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Store refused the operation.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "state store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "state store requires table `{table}`")
            }
            Self::Unavailable(message) => write!(f, "state store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Opaque single-blob key-value store.
pub trait StateStore {
    /// Reads the stored blob; `None` when nothing was written yet.
    fn get(&self) -> StoreResult<Option<String>>;
    /// Replaces the stored blob.
    fn set(&mut self, blob: &str) -> StoreResult<()>;
}

/// SQLite-backed store over the `kv_store` table.
pub struct SqliteStateStore<'conn> {
    conn: &'conn Connection,
    key: String,
}

impl<'conn> SqliteStateStore<'conn> {
    /// Creates a store for `STORAGE_KEY` from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        Self::with_key(conn, STORAGE_KEY)
    }

    /// Creates a store bound to a custom key.
    pub fn with_key(conn: &'conn Connection, key: impl Into<String>) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self {
            conn,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }
}

impl StateStore for SqliteStateStore<'_> {
    fn get(&self) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, blob: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key.as_str(), blob],
        )?;
        Ok(())
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'kv_store'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::MissingRequiredTable("kv_store"));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryInner {
    blob: Option<String>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

/// In-process store with injectable failures.
///
/// Clones share one buffer, so a handle kept outside a `Dashboard` observes
/// its writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().blob = Some(blob.into());
        store
    }

    /// Last written (or seeded) blob.
    pub fn blob(&self) -> Option<String> {
        self.inner.borrow().blob.clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.borrow_mut().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self) -> StoreResult<Option<String>> {
        let inner = self.inner.borrow();
        if inner.fail_reads {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        Ok(inner.blob.clone())
    }

    fn set(&mut self, blob: &str) -> StoreResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }
        inner.blob = Some(blob.to_string());
        inner.writes += 1;
        Ok(())
    }
}

//! SQLite-backed session repository.
//!
//! One `sessions` table keyed by session identifier. Expiry stamps are
//! stored as unix seconds; sub-second precision is dropped on write, which
//! matches the whole-second stamps the provider produces.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{Error, Result};
use crate::repository::{SessionRecord, SessionRepository};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id     TEXT PRIMARY KEY NOT NULL,
    data   BLOB NOT NULL DEFAULT x'',
    expiry INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions (expiry);
";

/// Session repository over SQLite.
///
/// Thread-safe via internal `Mutex<Connection>`. Expiry stamps are stored
/// as unix seconds, so several processes can share one database file.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open from a connection string: `:memory:` or a filesystem path.
    pub fn connect(connection: &str) -> Result<Self> {
        match connection.trim() {
            "" => Err(Error::Config("empty connection string".to_string())),
            ":memory:" => Self::open_in_memory(),
            path => Self::open(Path::new(path)),
        }
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store a record as-is. Overwrites any record
    /// with the same id.
    pub fn insert_record(&self, record: &SessionRecord) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO sessions (id, data, expiry) VALUES (?1, ?2, ?3)",
            params![record.id, record.data, record.expiry.timestamp()],
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl SessionRepository for SqliteRepository {
    fn read(&self, id: &str) -> Result<SessionRecord> {
        self.conn()
            .query_row(
                "SELECT id, data, expiry FROM sessions WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn create(&self, id: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        let now = now.timestamp();
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO sessions (id, data, expiry) VALUES (?1, x'', ?2)",
            params![id, now],
        )?;
        if inserted == 0 {
            return Err(Error::AlreadyExists(id.to_string()));
        }
        Ok(SessionRecord::new(id, from_secs(now)))
    }

    fn update(&self, id: &str, data: &[u8], now: DateTime<Utc>) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE sessions SET data = ?1, expiry = ?2 WHERE id = ?3",
            params![data, now.timestamp(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn regenerate(&self, old_id: &str, new_id: &str) -> Result<SessionRecord> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let taken: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                params![new_id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }

        let moved = tx.execute(
            "UPDATE sessions SET id = ?1 WHERE id = ?2",
            params![new_id, old_id],
        )?;
        if moved == 0 {
            return Err(Error::NotFound(old_id.to_string()));
        }

        let record = tx.query_row(
            "SELECT id, data, expiry FROM sessions WHERE id = ?1",
            params![new_id],
            row_to_record,
        )?;
        tx.commit()?;
        Ok(record)
    }

    fn count(&self) -> Result<usize> {
        let total: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        usize::try_from(total).map_err(|e| Error::Persistence(e.to_string()))
    }

    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let purged = self.conn().execute(
            "DELETE FROM sessions WHERE expiry <= ?1",
            params![cutoff.timestamp()],
        )?;
        debug!(purged, cutoff = %cutoff, "Purged expired session records");
        Ok(purged)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        data: row.get(1)?,
        expiry: from_secs(row.get(2)?),
    })
}

fn from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

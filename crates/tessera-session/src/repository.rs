//! Record repository abstraction for persisted sessions.
//!
//! The provider never talks to a database directly. It goes through
//! [`SessionRepository`], which keeps one [`SessionRecord`] per session
//! identifier. Two implementations ship with the crate:
//!
//! ```text
//! SessionRepository (trait)
//!     └── SqliteRepository   - durable, shared between processes
//!     └── MemoryRepository   - in-process table, doubles as a test spy
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Persisted form of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: String,

    /// Encoded attribute mapping. Empty means "no attributes yet".
    pub data: Vec<u8>,

    /// When the record was last written.
    pub expiry: DateTime<Utc>,
}

impl SessionRecord {
    /// Create an empty record stamped at `expiry`.
    pub fn new(id: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data: Vec::new(),
            expiry,
        }
    }

    /// Set the encoded attribute blob.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/// Whether a record last written at `expiry` is stale at `now`.
///
/// Stale means `expiry + max_lifetime <= now`. A lifetime too large to
/// represent never expires.
pub fn is_expired(
    expiry: DateTime<Utc>,
    max_lifetime: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    match expiry.checked_add_signed(max_lifetime) {
        Some(deadline) => deadline <= now,
        None => false,
    }
}

/// Latest expiry stamp that counts as stale at `now`, if any can.
pub fn expiry_cutoff(
    now: DateTime<Utc>,
    max_lifetime: chrono::Duration,
) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(max_lifetime)
}

/// Trait for session record backends.
///
/// Each method is expected to be individually atomic. Nothing here spans
/// more than one call, so a read followed later by an update is not a
/// transaction.
///
/// Repositories have no clock of their own. Every stamp and purge cutoff
/// is supplied by the caller, so the provider's clock is the single time
/// source for writing and for judging freshness.
pub trait SessionRepository: Send + Sync {
    /// Fetch the record for `id`. Fails with [`Error::NotFound`] if absent.
    fn read(&self, id: &str) -> Result<SessionRecord>;

    /// Insert an empty record stamped `now`.
    ///
    /// Fails with [`Error::AlreadyExists`] if `id` is taken.
    fn create(&self, id: &str, now: DateTime<Utc>) -> Result<SessionRecord>;

    /// Replace the blob for `id` and stamp the record with `now`.
    fn update(&self, id: &str, data: &[u8], now: DateTime<Utc>) -> Result<()>;

    /// Whether a record exists for `id`.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Remove the record for `id`. Removing an absent record is not an error.
    fn delete(&self, id: &str) -> Result<()>;

    /// Re-key the record from `old_id` to `new_id`, keeping data and expiry.
    ///
    /// Fails with [`Error::NotFound`] if `old_id` is absent and
    /// [`Error::AlreadyExists`] if `new_id` is taken. Either the rename
    /// happens completely or not at all.
    fn regenerate(&self, old_id: &str, new_id: &str) -> Result<SessionRecord>;

    /// Number of stored records, stale or not.
    fn count(&self) -> Result<usize>;

    /// Delete every record whose expiry is at or before `cutoff`.
    ///
    /// With `cutoff` from [`expiry_cutoff`] this removes exactly the records
    /// [`is_expired`] reports as stale. Returns how many were removed.
    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// In-memory repository.
///
/// Useful for single-process deployments and tests. Call counters and an
/// outage switch make it usable as a spy.
pub struct MemoryRepository {
    records: Mutex<HashMap<String, SessionRecord>>,
    failing: AtomicBool,
    update_calls: AtomicUsize,
    purge_calls: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            update_calls: AtomicUsize::new(0),
            purge_calls: AtomicUsize::new(0),
        }
    }

    /// Store a record as-is. Overwrites any record
    /// with the same id.
    pub fn insert_record(&self, record: SessionRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    /// Snapshot of the record for `id`, without counting as a read.
    pub fn record(&self, id: &str) -> Option<SessionRecord> {
        self.records.lock().get(id).cloned()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `update` calls received so far.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `purge_expired` calls received so far.
    pub fn purge_calls(&self) -> usize {
        self.purge_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Persistence("repository unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("records", &self.records.lock().len())
            .field("failing", &self.failing.load(Ordering::SeqCst))
            .finish()
    }
}

impl SessionRepository for MemoryRepository {
    fn read(&self, id: &str) -> Result<SessionRecord> {
        self.check_available()?;
        self.records
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn create(&self, id: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        self.check_available()?;
        let mut records = self.records.lock();
        if records.contains_key(id) {
            return Err(Error::AlreadyExists(id.to_string()));
        }
        let record = SessionRecord::new(id, now);
        records.insert(id.to_string(), record.clone());
        Ok(record)
    }

    fn update(&self, id: &str, data: &[u8], now: DateTime<Utc>) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut records = self.records.lock();
        match records.get_mut(id) {
            Some(record) => {
                record.data = data.to_vec();
                record.expiry = now;
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    fn exists(&self, id: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.records.lock().contains_key(id))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.check_available()?;
        self.records.lock().remove(id);
        Ok(())
    }

    fn regenerate(&self, old_id: &str, new_id: &str) -> Result<SessionRecord> {
        self.check_available()?;
        let mut records = self.records.lock();
        if records.contains_key(new_id) {
            return Err(Error::AlreadyExists(new_id.to_string()));
        }
        let mut record = records
            .remove(old_id)
            .ok_or_else(|| Error::NotFound(old_id.to_string()))?;
        record.id = new_id.to_string();
        records.insert(new_id.to_string(), record.clone());
        Ok(record)
    }

    fn count(&self) -> Result<usize> {
        self.check_available()?;
        Ok(self.records.lock().len())
    }

    fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.expiry > cutoff);
        Ok(before - records.len())
    }
}

//! Providers map session identifiers to persisted records.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::codec::{AttributeCodec, JsonCodec};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::repository::{SessionRecord, SessionRepository, expiry_cutoff, is_expired};
use crate::store::SessionStore;
use crate::value::Attributes;

/// Contract a host session framework drives.
///
/// Every call is synchronous. Nothing is cached between calls: each
/// `read`/`regenerate` builds a new [`SessionStore`].
pub trait Provider: Send + Sync {
    /// Name the provider is registered under.
    fn name(&self) -> &str;

    /// Load the session for `id`.
    ///
    /// Stale or empty records yield an empty store rather than an error.
    /// Only a failed fetch is a hard error.
    fn read(&self, id: &str) -> Result<SessionStore>;

    /// Whether a record exists for `id`.
    ///
    /// A repository failure is [`Error::Fatal`], never `false`.
    fn exist(&self, id: &str) -> Result<bool>;

    /// Permanently remove the session.
    fn destroy(&self, id: &str) -> Result<()>;

    /// Move the session from `old_id` to `new_id`, keeping its data.
    fn regenerate(&self, old_id: &str, new_id: &str) -> Result<SessionStore>;

    /// Number of stored sessions.
    ///
    /// A repository failure is [`Error::Fatal`], never `0`.
    fn count(&self) -> Result<usize>;

    /// Purge expired sessions. Failures are logged, not returned.
    fn gc(&self);
}

/// Provider backed by a [`SessionRepository`].
///
/// The provider's clock is the only time source: it stamps created and
/// released records, judges freshness on read and regenerate, and picks
/// the purge cutoff for `gc`. Time is taken in whole seconds.
pub struct DbProvider {
    repository: Arc<dyn SessionRepository>,
    codec: Arc<dyn AttributeCodec>,
    clock: Arc<dyn Clock>,
    max_lifetime: Duration,
}

impl DbProvider {
    /// Name this provider registers under.
    pub const NAME: &'static str = "db";

    /// Create a provider over `repository` with the JSON codec and the
    /// system clock.
    pub fn new(repository: Arc<dyn SessionRepository>, max_lifetime: Duration) -> Self {
        Self {
            repository,
            codec: Arc::new(JsonCodec),
            clock: Arc::new(SystemClock),
            max_lifetime,
        }
    }

    /// Create a provider from configuration.
    pub fn from_config(repository: Arc<dyn SessionRepository>, config: &SessionConfig) -> Self {
        Self::new(repository, config.max_lifetime)
    }

    /// Use a different attribute codec.
    pub fn with_codec(mut self, codec: Arc<dyn AttributeCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Use a different time source for stamps, freshness checks and gc.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configure the lifetime policy.
    ///
    /// The connection string belongs to the repository, which is already
    /// connected by the time a provider exists; it is not interpreted here.
    pub fn init(&mut self, max_lifetime_secs: u64, connection: &str) -> Result<()> {
        self.max_lifetime = Duration::from_secs(max_lifetime_secs);
        debug!(
            max_lifetime_secs,
            connection_configured = !connection.is_empty(),
            "Session provider initialized"
        );
        Ok(())
    }

    /// The configured maximum lifetime.
    pub fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    /// The repository this provider persists through.
    pub fn repository(&self) -> &Arc<dyn SessionRepository> {
        &self.repository
    }

    /// Load the session for `id`, creating an empty record if none exists.
    ///
    /// This is the entry point for a brand new identifier handed out by the
    /// host framework.
    pub fn read_or_create(&self, id: &str) -> Result<SessionStore> {
        match self.repository.create(id, self.clock.stamp()) {
            Ok(record) => {
                debug!(session_id = %id, "Created session record");
                self.build_store(id, &record)
            }
            Err(Error::AlreadyExists(_)) => self.read(id),
            Err(e) => Err(e),
        }
    }

    /// Whether `record` is past its lifetime right now.
    pub fn is_stale(&self, record: &SessionRecord) -> bool {
        is_expired(record.expiry, self.lifetime_delta(), self.clock.stamp())
    }

    fn lifetime_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.max_lifetime).unwrap_or(chrono::Duration::MAX)
    }

    /// Shared by `read` and `regenerate` so both agree on freshness.
    fn build_store(&self, id: &str, record: &SessionRecord) -> Result<SessionStore> {
        let attributes = if record.data.is_empty() {
            Attributes::new()
        } else if self.is_stale(record) {
            debug!(session_id = %id, expiry = %record.expiry, "Session expired, starting empty");
            Attributes::new()
        } else {
            self.codec.decode(&record.data)?
        };

        Ok(SessionStore::new(
            id,
            attributes,
            Arc::clone(&self.repository),
            Arc::clone(&self.codec),
            Arc::clone(&self.clock),
        ))
    }
}

impl std::fmt::Debug for DbProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbProvider")
            .field("max_lifetime", &self.max_lifetime)
            .finish_non_exhaustive()
    }
}

impl Provider for DbProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn read(&self, id: &str) -> Result<SessionStore> {
        let record = self.repository.read(id)?;
        self.build_store(id, &record)
    }

    fn exist(&self, id: &str) -> Result<bool> {
        self.repository.exists(id).map_err(|e| {
            error!(session_id = %id, error = %e, "Error checking session existence");
            Error::fatal("exist", e)
        })
    }

    fn destroy(&self, id: &str) -> Result<()> {
        self.repository.delete(id)?;
        debug!(session_id = %id, "Session destroyed");
        Ok(())
    }

    fn regenerate(&self, old_id: &str, new_id: &str) -> Result<SessionStore> {
        let record = self.repository.regenerate(old_id, new_id)?;
        debug!(old_id = %old_id, new_id = %new_id, "Session regenerated");
        self.build_store(new_id, &record)
    }

    fn count(&self) -> Result<usize> {
        self.repository.count().map_err(|e| {
            error!(error = %e, "Error counting sessions");
            Error::fatal("count", e)
        })
    }

    fn gc(&self) {
        let Some(cutoff) = expiry_cutoff(self.clock.stamp(), self.lifetime_delta()) else {
            debug!("Lifetime exceeds clock range, nothing to collect");
            return;
        };
        match self.repository.purge_expired(cutoff) {
            Ok(purged) => debug!(purged, "Session garbage collection complete"),
            Err(e) => error!(error = %e, "Error garbage collecting sessions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::repository::MemoryRepository;
    use crate::value::Value;

    fn setup(max_lifetime_secs: u64) -> (Arc<ManualClock>, Arc<MemoryRepository>, DbProvider) {
        let clock = Arc::new(ManualClock::new(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let repo = Arc::new(MemoryRepository::new());
        let provider = DbProvider::new(repo.clone(), Duration::from_secs(max_lifetime_secs))
            .with_clock(clock.clone());
        (clock, repo, provider)
    }

    fn encoded(pairs: &[(&str, Value)]) -> Vec<u8> {
        let attrs: Attributes = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        JsonCodec.encode(&attrs).unwrap()
    }

    #[test]
    fn test_read_fresh_record() {
        let (clock, repo, provider) = setup(3600);
        repo.insert_record(
            SessionRecord::new("s1", clock.now() - chrono::Duration::seconds(10))
                .with_data(encoded(&[("role", Value::from("admin"))])),
        );

        let store = provider.read("s1").unwrap();
        assert_eq!(store.get("role"), Some(Value::from("admin")));
    }

    #[test]
    fn test_read_expired_record_is_empty_and_kept() {
        let (clock, repo, provider) = setup(3600);
        repo.insert_record(
            SessionRecord::new("s1", clock.now() - chrono::Duration::seconds(7200))
                .with_data(encoded(&[("role", Value::from("admin"))])),
        );

        let store = provider.read("s1").unwrap();
        assert!(store.is_empty());
        // Lazy expiry: the record stays until gc
        assert!(provider.exist("s1").unwrap());
    }

    #[test]
    fn test_read_expired_garbage_does_not_decode() {
        let (clock, repo, provider) = setup(60);
        repo.insert_record(
            SessionRecord::new("s1", clock.now() - chrono::Duration::seconds(60))
                .with_data(b"\xff\xfenot-a-blob".to_vec()),
        );
        assert!(provider.read("s1").unwrap().is_empty());
    }

    #[test]
    fn test_read_fresh_garbage_is_decode_error() {
        let (clock, repo, provider) = setup(60);
        repo.insert_record(SessionRecord::new("s1", clock.now()).with_data(b"garbage".to_vec()));
        assert!(matches!(provider.read("s1"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_clock, _repo, provider) = setup(60);
        assert!(provider.read("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_or_create() {
        let (_clock, repo, provider) = setup(60);
        let store = provider.read_or_create("fresh").unwrap();
        assert!(store.is_empty());
        assert_eq!(repo.count().unwrap(), 1);

        store.set("uid", 7i64);
        store.release().unwrap();

        let again = provider.read_or_create("fresh").unwrap();
        assert_eq!(again.get("uid"), Some(Value::Int(7)));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_regenerate_carries_attributes() {
        let (clock, repo, provider) = setup(3600);
        repo.insert_record(
            SessionRecord::new("old", clock.now()).with_data(encoded(&[("uid", Value::Int(42))])),
        );

        let store = provider.regenerate("old", "new").unwrap();
        assert_eq!(store.id(), "new");
        assert_eq!(store.get("uid"), Some(Value::Int(42)));
        assert!(!provider.exist("old").unwrap());
        assert!(provider.exist("new").unwrap());

        let reread = provider.read("new").unwrap();
        assert_eq!(reread.get("uid"), Some(Value::Int(42)));
    }

    #[test]
    fn test_regenerate_applies_same_expiry() {
        let (clock, repo, provider) = setup(3600);
        repo.insert_record(
            SessionRecord::new("old", clock.now() - chrono::Duration::seconds(3600))
                .with_data(encoded(&[("uid", Value::Int(42))])),
        );

        let store = provider.regenerate("old", "new").unwrap();
        assert!(store.is_empty());
        assert!(provider.exist("new").unwrap());
    }

    #[test]
    fn test_regenerate_missing_old_is_not_found() {
        let (_clock, _repo, provider) = setup(60);
        assert!(provider.regenerate("nope", "new").unwrap_err().is_not_found());
        assert!(!provider.exist("new").unwrap());
    }

    #[test]
    fn test_exist_and_count_escalate_failures() {
        let (_clock, repo, provider) = setup(60);
        repo.set_failing(true);
        assert!(matches!(provider.exist("s1"), Err(Error::Fatal { .. })));
        assert!(matches!(provider.count(), Err(Error::Fatal { .. })));
    }

    #[test]
    fn test_destroy_decrements_count() {
        let (clock, repo, provider) = setup(60);
        repo.create("a", clock.now()).unwrap();
        repo.create("b", clock.now()).unwrap();
        assert_eq!(provider.count().unwrap(), 2);

        provider.destroy("a").unwrap();
        assert_eq!(provider.count().unwrap(), 1);
        assert!(!provider.exist("a").unwrap());
    }

    #[test]
    fn test_gc_removes_only_expired() {
        let (clock, repo, provider) = setup(100);
        let now = clock.now();
        repo.insert_record(SessionRecord::new("dead", now - chrono::Duration::seconds(100)));
        repo.insert_record(SessionRecord::new("older", now - chrono::Duration::seconds(500)));
        repo.insert_record(SessionRecord::new("alive", now - chrono::Duration::seconds(99)));

        provider.gc();

        assert_eq!(provider.count().unwrap(), 1);
        assert!(provider.exist("alive").unwrap());
    }

    #[test]
    fn test_gc_swallows_failures() {
        let (_clock, repo, provider) = setup(100);
        repo.set_failing(true);
        provider.gc();
        assert_eq!(repo.purge_calls(), 1);
    }

    #[test]
    fn test_non_finite_float_survives_release() {
        let (_clock, _repo, provider) = setup(3600);
        let store = provider.read_or_create("s").unwrap();
        store.set("score", f64::NAN);
        store.set("uid", 42i64);
        store.release().unwrap();

        let store = provider.read("s").unwrap();
        assert!(matches!(store.get("score"), Some(Value::Float(x)) if x.is_nan()));
        assert_eq!(store.get("uid"), Some(Value::Int(42)));
    }

    #[test]
    fn test_provider_clock_drives_stamps_and_gc() {
        // The provider's clock is an hour ahead of the wall clock; the
        // repository has no clock of its own to disagree with it.
        let clock = Arc::new(ManualClock::new(Utc::now() + chrono::Duration::hours(1)));
        let repo = Arc::new(MemoryRepository::new());
        let provider =
            DbProvider::new(repo.clone(), Duration::from_secs(60)).with_clock(clock.clone());

        let store = provider.read_or_create("s").unwrap();
        store.set("k", "v");
        store.release().unwrap();
        assert_eq!(repo.record("s").unwrap().expiry, clock.stamp());

        clock.advance(chrono::Duration::seconds(59));
        provider.gc();
        assert_eq!(provider.read("s").unwrap().get("k"), Some(Value::from("v")));

        clock.advance(chrono::Duration::seconds(1));
        assert!(provider.read("s").unwrap().is_empty());
        provider.gc();
        assert!(!provider.exist("s").unwrap());
    }

    #[test]
    fn test_subsecond_clock_agrees_across_backends() {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 800_000_000).unwrap();
        let memory: Arc<dyn SessionRepository> = Arc::new(MemoryRepository::new());
        let sqlite: Arc<dyn SessionRepository> =
            Arc::new(crate::sqlite::SqliteRepository::open_in_memory().unwrap());

        for repo in [memory, sqlite] {
            let clock = Arc::new(ManualClock::new(start));
            let provider =
                DbProvider::new(repo.clone(), Duration::from_secs(60)).with_clock(clock.clone());
            let store = provider.read_or_create("s").unwrap();
            store.set("k", "v");
            store.release().unwrap();
            assert_eq!(repo.read("s").unwrap().expiry, clock.stamp());

            clock.advance(chrono::Duration::milliseconds(59_100));
            assert_eq!(provider.read("s").unwrap().get("k"), Some(Value::from("v")));

            clock.advance(chrono::Duration::milliseconds(300));
            assert!(provider.read("s").unwrap().is_empty());
        }
    }

    #[test]
    fn test_init_sets_lifetime() {
        let (_clock, _repo, mut provider) = setup(60);
        provider.init(7200, "ignored").unwrap();
        assert_eq!(provider.max_lifetime(), Duration::from_secs(7200));
        assert_eq!(provider.name(), "db");
    }
}

//! Working copy of one session's attributes.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::codec::AttributeCodec;
use crate::error::Result;
use crate::repository::SessionRepository;
use crate::value::{Attributes, Value};

/// The lock-guarded attribute mapping of a single session.
///
/// A store is built by a provider for one request and is not cached
/// anywhere. Reads take a shared lock and mutations an exclusive one, so
/// concurrent requests on the same session never observe a partial write.
/// Callers should stop mutating a store before calling
/// [`release`](Self::release).
pub struct SessionStore {
    id: String,
    attributes: RwLock<Attributes>,
    repository: Arc<dyn SessionRepository>,
    codec: Arc<dyn AttributeCodec>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Bind `attributes` to session `id`, persisting through `repository`.
    ///
    /// `clock` stamps the record on release and should be the one the
    /// owning provider judges freshness with.
    pub fn new(
        id: impl Into<String>,
        attributes: Attributes,
        repository: Arc<dyn SessionRepository>,
        codec: Arc<dyn AttributeCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: id.into(),
            attributes: RwLock::new(attributes),
            repository,
            codec,
            clock,
        }
    }

    /// Insert or overwrite an attribute.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.write().insert(key.into(), value.into());
    }

    /// Get a copy of an attribute, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }

    /// Remove an attribute. Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.attributes.write().remove(key);
    }

    /// The session identifier this store is bound to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drop every attribute without persisting anything.
    ///
    /// The old mapping is swapped out for a new one rather than cleared.
    pub fn flush(&self) {
        let old = std::mem::take(&mut *self.attributes.write());
        trace!(session_id = %self.id, dropped = old.len(), "Session flushed");
    }

    /// Whether `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.read().contains_key(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.read().len()
    }

    /// Whether the store holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.read().is_empty()
    }

    /// Clone of the whole mapping.
    pub fn snapshot(&self) -> Attributes {
        self.attributes.read().clone()
    }

    /// Encode the attributes and write them back to the repository.
    ///
    /// An empty store writes nothing, which also leaves the record's expiry
    /// stamp untouched.
    pub fn release(&self) -> Result<()> {
        let blob = {
            let attributes = self.attributes.read();
            if attributes.is_empty() {
                trace!(session_id = %self.id, "Empty session, skipping save");
                return Ok(());
            }
            self.codec.encode(&attributes)?
        };

        self.repository.update(&self.id, &blob, self.clock.stamp())?;
        debug!(session_id = %self.id, bytes = blob.len(), "Session saved");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("id", &self.id)
            .field("attributes", &*self.attributes.read())
            .finish_non_exhaustive()
    }
}

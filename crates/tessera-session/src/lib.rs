//! Durable key-value session store.
//!
//! This crate persists per-user session state in a backing record store:
//! - [`SessionStore`]: lock-guarded attributes of one session, saved on release
//! - [`DbProvider`]: maps identifiers to records with lazy expiry, regeneration
//!   and garbage collection
//! - [`SessionRepository`]: the record backend ([`SqliteRepository`],
//!   [`MemoryRepository`])
//! - [`GcTask`]: periodic sweeping of expired records
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_session::{DbProvider, Provider, SqliteRepository};
//!
//! let repo = Arc::new(SqliteRepository::open(Path::new("sessions.db"))?);
//! let provider = DbProvider::new(repo, Duration::from_secs(3600));
//!
//! let store = provider.read_or_create("3f2a...")?;
//! store.set("uid", 42i64);
//! store.release()?;
//! ```

mod clock;
mod codec;
mod config;
mod error;
mod gc;
mod provider;
mod registry;
mod repository;
mod sqlite;
mod store;
mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{AttributeCodec, JsonCodec};
pub use config::{DEFAULT_CONNECTION, DEFAULT_GC_INTERVAL, DEFAULT_MAX_LIFETIME, SessionConfig};
pub use error::{Error, Result};
pub use gc::GcTask;
pub use provider::{DbProvider, Provider};
pub use registry::ProviderRegistry;
pub use repository::{
    MemoryRepository, SessionRecord, SessionRepository, expiry_cutoff, is_expired,
};
pub use sqlite::SqliteRepository;
pub use store::SessionStore;
pub use value::{Attributes, Value};

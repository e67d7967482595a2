//! Configuration for session providers.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default maximum session lifetime (one day).
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(86_400);

/// Default interval between garbage collection sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Default connection string for the SQLite repository.
pub const DEFAULT_CONNECTION: &str = "sessions.db";

/// Configuration for a session provider.
///
/// Loaded from the `[session]` table of a TOML file:
///
/// ```toml
/// [session]
/// provider = "db"
/// max_lifetime = 3600
/// connection = "/var/lib/app/sessions.db"
/// gc_interval = 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the provider to use.
    pub provider: String,

    /// Seconds after its last write that a session's data is discarded.
    #[serde(with = "secs")]
    pub max_lifetime: Duration,

    /// Connection string forwarded to the repository.
    pub connection: String,

    /// Seconds between garbage collection sweeps.
    #[serde(with = "secs")]
    pub gc_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: crate::provider::DbProvider::NAME.to_string(),
            max_lifetime: DEFAULT_MAX_LIFETIME,
            connection: DEFAULT_CONNECTION.to_string(),
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    session: SessionConfig,
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `[session]` table of a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.session.validate()?;
        Ok(file.session)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the maximum session lifetime.
    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    /// Set the repository connection string.
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Set the garbage collection interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Reject values no provider can work with.
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(Error::Config("provider name is empty".to_string()));
        }
        if self.max_lifetime.is_zero() {
            return Err(Error::Config("max_lifetime must be positive".to_string()));
        }
        if self.gc_interval.is_zero() {
            return Err(Error::Config("gc_interval must be positive".to_string()));
        }
        Ok(())
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

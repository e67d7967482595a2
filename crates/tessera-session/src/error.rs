//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No record exists for the session identifier.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// A record already exists under the target identifier.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// The attribute mapping could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// The persisted blob could not be decoded into an attribute mapping.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Error from the record repository.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error from the SQLite backend.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A check the caller cannot proceed without failed (existence, count).
    ///
    /// Distinct from "absent" or "zero": the repository could not answer.
    #[error("Fatal error during {operation}: {message}")]
    Fatal { operation: String, message: String },

    /// A provider with this name is already registered.
    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    /// No provider is registered under this name.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Escalate a repository failure to a fatal condition for `operation`.
    pub(crate) fn fatal(operation: &str, source: Error) -> Self {
        Error::Fatal {
            operation: operation.to_string(),
            message: source.to_string(),
        }
    }

    /// Whether this error means the session record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;

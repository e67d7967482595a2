//! CLI command handlers.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tessera_session::{DbProvider, Provider, ProviderRegistry, SessionConfig, SqliteRepository};

pub mod count;
pub mod destroy;
pub mod exists;
pub mod gc;
pub mod regenerate;
pub mod show;
pub mod sweep;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved session configuration.
    pub config: SessionConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// An opened session database and the provider selected by configuration.
pub struct Backend {
    pub repository: Arc<SqliteRepository>,
    pub provider: Arc<dyn Provider>,
}

impl Context {
    /// Open the configured database and resolve the configured provider.
    pub fn backend(&self) -> Result<Backend> {
        let repository = Arc::new(
            SqliteRepository::connect(&self.config.connection)
                .with_context(|| format!("opening session database '{}'", self.config.connection))?,
        );

        let registry = ProviderRegistry::new().with(Arc::new(DbProvider::from_config(
            repository.clone(),
            &self.config,
        )))?;
        let provider = registry.get(&self.config.provider)?;

        Ok(Backend {
            repository,
            provider,
        })
    }
}

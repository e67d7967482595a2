//! Tessera - inspect and maintain durable session stores
//!
//! Main entry point for the Tessera CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tessera_session::SessionConfig;

mod commands;

use commands::{count, destroy, exists, gc, regenerate, show, sweep};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tessera - inspect and maintain durable session stores
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file with a [session] table
    #[arg(short, long, global = true, env = "TESSERA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session database (overrides the configured connection)
    #[arg(long, global = true, env = "TESSERA_DB")]
    pub db: Option<String>,

    /// Maximum session lifetime in seconds (overrides the config file)
    #[arg(long, global = true)]
    pub max_lifetime: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count stored sessions
    Count(count::CountArgs),

    /// Show a session record and its attributes
    Show(show::ShowArgs),

    /// Check whether a session exists
    Exists(exists::ExistsArgs),

    /// Permanently delete a session
    Destroy(destroy::DestroyArgs),

    /// Move a session to a new identifier
    Regenerate(regenerate::RegenerateArgs),

    /// Purge expired sessions once
    Gc(gc::GcArgs),

    /// Purge expired sessions periodically until interrupted
    Sweep(sweep::SweepArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "tessera=debug,tessera_session=debug,info"
    } else {
        "tessera=info,tessera_session=info,warn"
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
                ),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(db) = cli.db {
        config.connection = db;
    }
    if let Some(secs) = cli.max_lifetime {
        config.max_lifetime = std::time::Duration::from_secs(secs);
    }
    config.validate().context("invalid session configuration")?;

    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Count(args) => count::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Exists(args) => exists::run(args, &ctx).await,
        Commands::Destroy(args) => destroy::run(args, &ctx).await,
        Commands::Regenerate(args) => regenerate::run(args, &ctx).await,
        Commands::Gc(args) => gc::run(args, &ctx).await,
        Commands::Sweep(args) => sweep::run(args, &ctx).await,
    }
}

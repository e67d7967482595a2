//! Show command - display a session record and its attributes.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use tessera_session::{Clock, SessionRepository, SystemClock, Value, is_expired};

use super::Context;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Session identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    id: String,
    last_write: DateTime<Utc>,
    expired: bool,
    bytes: usize,
    attributes: BTreeMap<String, Value>,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let record = backend
        .repository
        .read(&args.id)
        .with_context(|| format!("reading session '{}'", args.id))?;

    let lifetime = chrono::Duration::from_std(ctx.config.max_lifetime)
        .unwrap_or(chrono::Duration::MAX);
    let expired = is_expired(record.expiry, lifetime, SystemClock.stamp());

    let store = backend.provider.read(&args.id)?;
    let output = ShowOutput {
        id: record.id.clone(),
        last_write: record.expiry,
        expired,
        bytes: record.data.len(),
        attributes: store.snapshot().into_iter().collect(),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state = if output.expired {
        Style::new().red().apply_to("● expired")
    } else {
        Style::new().green().apply_to("● fresh")
    };

    println!();
    println!("{}", style(format!("Session {}", output.id)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("State:"), state);
    println!("  {} {}", dim.apply_to("Last write:"), output.last_write.to_rfc3339());
    println!("  {} {} bytes", dim.apply_to("Size:"), output.bytes);

    if !output.attributes.is_empty() {
        println!();
        for (key, value) in &output.attributes {
            println!(
                "  {} {} {}",
                style(key).cyan(),
                dim.apply_to(format!("({})", value.kind())),
                value
            );
        }
    } else if ctx.verbose {
        println!();
        println!("  {}", dim.apply_to("(no attributes)"));
    }
    println!();
    Ok(())
}

//! GC command - purge expired sessions once.

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the gc command.
#[derive(Args, Debug)]
pub struct GcArgs {}

#[derive(Debug, Serialize)]
struct GcOutput {
    before: usize,
    after: usize,
    removed: usize,
}

/// Run the gc command.
pub async fn run(_args: GcArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;

    let before = backend.provider.count()?;
    backend.provider.gc();
    let after = backend.provider.count()?;
    let output = GcOutput {
        before,
        after,
        removed: before.saturating_sub(after),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        println!(
            "Removed {} expired sessions {}",
            output.removed,
            dim.apply_to(format!("({} remaining)", output.after))
        );
    }
    Ok(())
}

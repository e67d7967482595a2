//! Count command - number of stored sessions.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the count command.
#[derive(Args, Debug)]
pub struct CountArgs {}

#[derive(Debug, Serialize)]
struct CountOutput {
    sessions: usize,
}

/// Run the count command.
pub async fn run(_args: CountArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let sessions = backend.provider.count()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&CountOutput { sessions })?);
    } else {
        println!("{sessions}");
    }
    Ok(())
}

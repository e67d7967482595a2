//! Exists command - check whether a session record exists.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Context;

/// Arguments for the exists command.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Session identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ExistsOutput<'a> {
    id: &'a str,
    exists: bool,
}

/// Run the exists command.
pub async fn run(args: ExistsArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let exists = backend.provider.exist(&args.id)?;

    if ctx.json_output {
        let output = ExistsOutput {
            id: &args.id,
            exists,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{exists}");
    }
    Ok(())
}

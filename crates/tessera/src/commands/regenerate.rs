//! Regenerate command - move a session to a new identifier.

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the regenerate command.
#[derive(Args, Debug)]
pub struct RegenerateArgs {
    /// Current session identifier
    pub old_id: String,

    /// New session identifier
    pub new_id: String,
}

#[derive(Debug, Serialize)]
struct RegenerateOutput<'a> {
    old_id: &'a str,
    new_id: &'a str,
    attributes: usize,
}

/// Run the regenerate command.
pub async fn run(args: RegenerateArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let store = backend
        .provider
        .regenerate(&args.old_id, &args.new_id)
        .with_context(|| format!("regenerating '{}' as '{}'", args.old_id, args.new_id))?;

    if ctx.json_output {
        let output = RegenerateOutput {
            old_id: &args.old_id,
            new_id: store.id(),
            attributes: store.len(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!(
            "{} {} → {} {}",
            green.apply_to("Regenerated"),
            args.old_id,
            store.id(),
            dim.apply_to(format!("({} attributes)", store.len()))
        );
    }
    Ok(())
}

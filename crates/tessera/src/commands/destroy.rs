//! Destroy command - permanently delete a session.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the destroy command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Session identifier
    pub id: String,

    /// Fail if the session does not exist
    #[arg(long)]
    pub strict: bool,
}

/// Run the destroy command.
pub async fn run(args: DestroyArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;

    if args.strict && !backend.provider.exist(&args.id)? {
        bail!("session '{}' not found", args.id);
    }
    backend.provider.destroy(&args.id)?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "destroyed": args.id }))?
        );
    } else {
        let green = Style::new().green();
        println!("{} {}", green.apply_to("Destroyed"), args.id);
    }
    Ok(())
}

//! Sweep command - run periodic garbage collection until interrupted.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::Style;
use tessera_session::GcTask;
use tracing::info;

use super::Context;

/// Arguments for the sweep command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Seconds between sweeps (defaults to the configured gc_interval)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    let interval = args
        .interval
        .map(Duration::from_secs)
        .unwrap_or(ctx.config.gc_interval);

    if !ctx.json_output {
        let dim = Style::new().dim();
        println!(
            "Sweeping expired sessions every {}s {}",
            interval.as_secs(),
            dim.apply_to("(Ctrl-C to stop)")
        );
    }

    let task = GcTask::spawn(backend.provider, interval);
    tokio::signal::ctrl_c().await?;
    info!("Interrupted, stopping sweeper");
    task.shutdown().await;
    Ok(())
}

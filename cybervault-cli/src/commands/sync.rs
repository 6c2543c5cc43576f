//! Sync command - submit queued transactions

use anyhow::Result;
use cybervault_core::services::EntryPoint;
use cybervault_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("sync");

    let pb = output::spinner("Syncing offline queue...");
    let result = ctx.sync().await;
    pb.finish_and_clear();

    if json {
        let envelope = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if let Some(err) = envelope.error {
            anyhow::bail!(err);
        }
        return Ok(());
    }

    let report = result?;
    output::print_sync_report(&report);
    Ok(())
}

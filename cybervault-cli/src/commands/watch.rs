//! Watch command - stay running and sync whenever the server comes back

use anyhow::Result;
use colored::Colorize;
use cybervault_core::domain::result::Result as CoreResult;
use cybervault_core::services::{EntryPoint, SyncReport};

use super::get_context;
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Watch)?;
    ctx.log_command("watch");

    let session = ctx.auth_service.require_session()?;

    if !json {
        println!(
            "Watching {} every {}s for connectivity. Press Ctrl+C to stop.",
            ctx.config.api_url.bold(),
            ctx.config.probe_interval.as_secs()
        );
    }

    let on_report = move |result: CoreResult<SyncReport>| match result {
        Ok(report) if json => {
            if let Ok(line) = serde_json::to_string(&report) {
                println!("{}", line);
            }
        }
        Ok(report) => {
            output::info("Back online");
            output::print_sync_report(&report);
        }
        Err(e) => output::error(&format!("Sync failed: {}", e)),
    };

    tokio::select! {
        _ = ctx.watch(&session, on_report) => {}
        _ = tokio::signal::ctrl_c() => {
            if !json {
                println!();
                println!("Stopped.");
            }
        }
    }

    Ok(())
}

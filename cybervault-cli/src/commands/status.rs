//! Status command - connectivity, session and queue summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use cybervault_core::services::EntryPoint;

use super::get_context;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.refresh_connectivity().await;

    let session = ctx.auth_service.current_session()?;
    let status = ctx.status_service.get_status(session.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "CyberVault Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let connectivity = if status.online {
        "online".green().to_string()
    } else {
        "offline".yellow().to_string()
    };
    let queue = if status.queue_enabled {
        status.pending_transactions.to_string()
    } else {
        "unavailable".red().to_string()
    };

    table.add_row(vec!["Server".to_string(), status.api_url.clone()]);
    table.add_row(vec!["Connectivity".to_string(), connectivity]);
    table.add_row(vec![
        "User".to_string(),
        status.user_id.clone().unwrap_or_else(|| "not logged in".to_string()),
    ]);
    table.add_row(vec!["Queued transactions".to_string(), queue]);

    println!("{}", table);

    if status.pending_transactions > 0 && status.online && status.user_id.is_some() {
        println!();
        println!("Run {} to send queued transactions.", "cv sync".bold());
    }

    Ok(())
}

//! Queue commands - inspect or empty the offline queue

use anyhow::Result;
use clap::Subcommand;
use cybervault_core::services::EntryPoint;
use dialoguer::Confirm;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List transactions waiting to be synced
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard every queued transaction
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: QueueCommands) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;

    match command {
        QueueCommands::List { json } => {
            ctx.log_command("queue list");
            let entries = ctx.queue_service.drain_all().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("Offline queue is empty.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["#", "User", "Amount", "Type", "Captured", "Hash"]);
            for entry in &entries {
                let tx = &entry.transaction;
                table.add_row(vec![
                    entry.seq.to_string(),
                    tx.user_id.clone(),
                    tx.payload.amount.to_string(),
                    tx.payload.tx_type.clone(),
                    tx.timestamp.clone(),
                    output::abbreviate(&tx.integrity_hash, 12),
                ]);
            }
            println!("{}", table);
        }
        QueueCommands::Clear { force, json } => {
            ctx.log_command("queue clear");
            let pending = ctx.queue_service.len().await?;

            if pending > 0 && !force && !json {
                if !Confirm::new()
                    .with_prompt(format!(
                        "Discard {} queued transaction(s)? They will never be sent.",
                        pending
                    ))
                    .default(false)
                    .interact()?
                {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            ctx.queue_service.clear().await?;

            if json {
                println!("{}", serde_json::json!({ "cleared": pending }));
            } else {
                output::success(&format!("Cleared {} queued transaction(s)", pending));
            }
        }
    }

    Ok(())
}

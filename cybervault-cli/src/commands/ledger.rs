//! Ledger commands - server transaction list and blockchain view

use anyhow::Result;
use colored::Colorize;
use cybervault_core::services::EntryPoint;

use super::get_context;
use crate::output;

pub async fn run_transactions(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("transactions");

    let pb = output::spinner("Loading transactions...");
    let result = ctx.ledger_service.transactions().await;
    pb.finish_and_clear();
    let transactions = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "User", "Status", "Fraud", "Time"]);
    for tx in &transactions {
        let fraud = if tx.fraud_flag {
            "YES".red().to_string()
        } else {
            "no".to_string()
        };
        table.add_row(vec![
            tx.id.to_string(),
            tx.user_id.clone().unwrap_or_default(),
            tx.status.clone().unwrap_or_default(),
            fraud,
            tx.timestamp.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    let flagged = transactions.iter().filter(|tx| tx.fraud_flag).count();
    if flagged > 0 {
        output::warning(&format!(
            "{} of {} transactions flagged for fraud review",
            flagged,
            transactions.len()
        ));
    }
    Ok(())
}

pub async fn run_ledger(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("ledger");

    let pb = output::spinner("Loading ledger...");
    let result = ctx.ledger_service.blockchain().await;
    pb.finish_and_clear();
    let blocks = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    if blocks.is_empty() {
        println!("Ledger is empty.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Block", "Hash", "Previous", "Time"]);
    for block in &blocks {
        let prev = block
            .prev_hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .map(|h| output::abbreviate(h, 16))
            .unwrap_or_else(|| "genesis".dimmed().to_string());
        table.add_row(vec![
            block.id.to_string(),
            output::abbreviate(&block.block_hash, 16),
            prev,
            block.timestamp.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

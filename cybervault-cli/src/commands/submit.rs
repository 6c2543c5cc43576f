//! Submit command - send a transaction, or queue it when offline

use anyhow::Result;
use cybervault_core::adapters::connectivity::OFFLINE_ENV;
use cybervault_core::services::{EntryPoint, SubmitOutcome};
use cybervault_core::OperationResult;

use super::get_context;
use crate::output;

pub async fn run(amount: &str, tx_type: &str, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("submit");

    let pb = output::spinner("Submitting...");
    let result = ctx.submit(amount, tx_type).await;
    pb.finish_and_clear();

    if json {
        let envelope = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if let Some(err) = envelope.error {
            anyhow::bail!(err);
        }
        return Ok(());
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_transport() {
                output::info(&format!(
                    "Nothing was queued. Set {}=1 to queue transactions while the server is unreachable.",
                    OFFLINE_ENV
                ));
            }
            return Err(e.into());
        }
    };

    match outcome {
        SubmitOutcome::Submitted { receipt } if receipt.fraud_flag => {
            output::warning("Transaction submitted and flagged for fraud review");
        }
        SubmitOutcome::Submitted { .. } => {
            output::success("Transaction submitted");
        }
        SubmitOutcome::Queued { seq } => {
            output::info(&format!(
                "Offline: transaction queued (#{}). It will be sent on the next sync.",
                seq
            ));
        }
    }
    Ok(())
}

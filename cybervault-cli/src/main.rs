//! CyberVault CLI - transactions from your terminal, online or not

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{auth, ledger, logs, queue, status, submit, sync, watch};

/// CyberVault - submit transactions, queue them while offline
#[derive(Parser)]
#[command(name = "cv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        username: String,
        /// PIN (6-8 digits); prompted for if omitted
        #[arg(long)]
        pin: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in, then sync any queued transactions
    Login {
        username: String,
        /// PIN; prompted for if omitted
        #[arg(long)]
        pin: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out of the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a transaction (queued when offline)
    Submit {
        /// Amount, e.g. 10.50
        amount: String,
        /// Transaction type, e.g. deposit or withdraw
        #[arg(long = "type", short = 't', default_value = "deposit")]
        tx_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions recorded by the server
    Transactions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the server's blockchain ledger
    Ledger {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the offline queue
    Queue {
        #[command(subcommand)]
        command: queue::QueueCommands,
    },

    /// Send queued transactions now
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Keep running and sync whenever the server becomes reachable
    Watch {
        /// Output one JSON line per sync pass
        #[arg(long)]
        json: bool,
    },

    /// Show connectivity, session and queue status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { username, pin, json } => auth::run_register(&username, pin, json).await,
        Commands::Login { username, pin, json } => auth::run_login(&username, pin, json).await,
        Commands::Logout { json } => auth::run_logout(json),
        Commands::Submit { amount, tx_type, json } => submit::run(&amount, &tx_type, json).await,
        Commands::Transactions { json } => ledger::run_transactions(json).await,
        Commands::Ledger { json } => ledger::run_ledger(json).await,
        Commands::Queue { command } => queue::run(command).await,
        Commands::Sync { json } => sync::run(json).await,
        Commands::Watch { json } => watch::run(json).await,
        Commands::Status { json } => status::run(json).await,
        Commands::Logs { command } => logs::run(command),
    }
}

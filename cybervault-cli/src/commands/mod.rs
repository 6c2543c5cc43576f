//! CLI command implementations

pub mod auth;
pub mod ledger;
pub mod logs;
pub mod queue;
pub mod status;
pub mod submit;
pub mod sync;
pub mod watch;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cybervault_core::services::EntryPoint;
use cybervault_core::CyberVaultContext;
use dialoguer::Password;

/// Environment variable pointing at the data directory
const DATA_DIR_ENV: &str = "CYBERVAULT_DIR";

/// Environment variable supplying the PIN non-interactively
const PIN_ENV: &str = "CYBERVAULT_PIN";

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".cybervault"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DATA_DIR_ENV))
}

/// Get or create the CyberVault context
pub fn get_context(entry_point: EntryPoint) -> Result<CyberVaultContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    CyberVaultContext::new(&data_dir, entry_point)
        .context("Failed to initialize CyberVault context")
}

/// Get the PIN from --pin, CYBERVAULT_PIN, or an interactive prompt
pub fn get_pin_or_prompt(pin_flag: Option<String>, confirm: bool) -> Result<String> {
    if let Some(pin) = pin_flag {
        return Ok(pin);
    }
    if let Ok(pin) = std::env::var(PIN_ENV) {
        return Ok(pin);
    }

    let mut prompt = Password::new().with_prompt("PIN");
    if confirm {
        prompt = prompt.with_confirmation("Confirm PIN", "PINs do not match");
    }
    Ok(prompt.interact()?)
}

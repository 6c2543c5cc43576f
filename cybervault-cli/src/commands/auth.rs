//! Auth commands - register, login, logout

use anyhow::Result;
use colored::Colorize;
use cybervault_core::services::EntryPoint;

use super::{get_context, get_pin_or_prompt};
use crate::output;

pub async fn run_register(username: &str, pin: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("register");

    let pin = get_pin_or_prompt(pin, true)?;

    let pb = output::spinner("Registering...");
    let result = ctx.auth_service.register(username, &pin).await;
    pb.finish_and_clear();
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    output::success(&format!("Registered {}", username));
    if let Some(user_id) = &outcome.user_id {
        println!("  User ID: {}", user_id);
    }
    println!("Run {} to sign in.", format!("cv login {}", username).bold());
    Ok(())
}

pub async fn run_login(username: &str, pin: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("login");

    let pin = get_pin_or_prompt(pin, false)?;

    let pb = output::spinner("Signing in...");
    let result = ctx.login(username, &pin).await;
    pb.finish_and_clear();
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    output::success(&format!("Logged in as {}", username));
    println!("  User ID: {}", outcome.session.user_id);

    if let Some(report) = &outcome.sync {
        output::print_sync_report(report);
    }
    if let Some(err) = &outcome.sync_error {
        output::warning(&format!("Queued transactions were not synced: {}", err));
    }
    Ok(())
}

pub fn run_logout(json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    ctx.log_command("logout");

    let was_logged_in = ctx.auth_service.logout()?;

    if json {
        println!("{}", serde_json::json!({ "logged_out": was_logged_in }));
    } else if was_logged_in {
        output::success("Logged out");
    } else {
        output::info("Not logged in");
    }
    Ok(())
}

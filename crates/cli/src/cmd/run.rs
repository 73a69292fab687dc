//! Replay an edit script and report what the autosave engine did

use anyhow::Result;
use autosave_core::SyncConfig;
use autosave_journal::SaveOutcome;
use autosave_session::SaveStatus;
use cli_lib::script::{self, Replay, Script};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config: SyncConfig, path: &Path, json: bool) -> Result<()> {
    let script = Script::load(path)?;
    let replay = script::replay(script, config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&replay)?);
    } else {
        print_replay(&replay);
    }
    Ok(())
}

fn status_colored(status: SaveStatus) -> String {
    match status {
        SaveStatus::Idle => status.to_string().dimmed().to_string(),
        SaveStatus::Saving => status.to_string().yellow().to_string(),
        SaveStatus::Saved => status.to_string().green().to_string(),
        SaveStatus::Error => status.to_string().red().to_string(),
    }
}

fn print_replay(replay: &Replay) {
    println!("{}", "Status".bold());
    if replay.statuses.is_empty() {
        println!("  {}", "(no saves)".dimmed());
    }
    for t in &replay.statuses {
        println!("  {:>7}ms  {}", t.at_ms, status_colored(t.value));
    }

    if !replay.validations.is_empty() {
        println!("\n{}", "Handle".bold());
        for t in &replay.validations {
            println!(
                "  {:>7}ms  {} {}",
                t.at_ms,
                t.value.candidate.cyan(),
                t.value.state.dimmed()
            );
        }
    }

    if !replay.rejected.is_empty() {
        println!("\n{}", "Rejected".bold());
        for t in &replay.rejected {
            println!("  {:>7}ms  {}", t.at_ms, t.value.red());
        }
    }

    println!("\n{}", "Saves".bold());
    if replay.history.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for entry in &replay.history {
        let fields: Vec<&str> = entry.changed.iter().map(|f| f.as_str()).collect();
        let outcome = match &entry.outcome {
            SaveOutcome::Succeeded => "ok".green().to_string(),
            SaveOutcome::Failed(e) => format!("failed: {e}").red().to_string(),
            SaveOutcome::InFlight => "abandoned".yellow().to_string(),
        };
        println!(
            "  {}  {}  [{}]  {}",
            entry.id.to_string().dimmed(),
            entry.fingerprint.short(),
            fields.join(", "),
            outcome
        );
    }

    println!("\n{}", "Final".bold());
    println!("  {}: {}", "handle".cyan(), replay.baseline.username);
    if let Some(validation) = replay.final_validation() {
        if validation.candidate != replay.baseline.username {
            println!(
                "  {}: {} ({}, not saved)",
                "typed handle".cyan(),
                validation.candidate,
                validation.state
            );
        }
    }
    if let Some(bio) = &replay.baseline.bio {
        println!("  {}: {}", "bio".cyan(), bio);
    }
    let tags: Vec<&str> = replay.baseline.tags.iter().map(|t| t.0.as_str()).collect();
    println!("  {}: [{}]", "tags".cyan(), tags.join(", "));
    println!("  {}: {}", "status".cyan(), status_colored(replay.final_status));
    if replay.discarded_edits {
        println!("  {}", "unsettled edits were discarded on unmount".yellow());
    }
    if replay.abandoned_write {
        println!("  {}", "a write was still in flight on unmount".yellow());
    }
}

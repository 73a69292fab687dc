//! Local handle shape check

use anyhow::Result;
use autosave_core::{normalize_handle_input, SyncConfig};
use owo_colors::OwoColorize;

pub fn run(config: &SyncConfig, value: &str) -> Result<()> {
    let candidate = normalize_handle_input(value);
    if candidate != value {
        println!("{} {}", "Normalized to".dimmed(), candidate.cyan());
    }

    let shape = config.handle_rules().check(&candidate);
    if !shape.is_valid() {
        anyhow::bail!("Handle '{}' is {}", candidate, shape);
    }

    println!(
        "{} '{}' passes local rules ({}-{} characters, a-z 0-9 _)",
        "✓".green(),
        candidate,
        config.handle_min_len,
        config.handle_max_len
    );
    println!("{}", "Availability is only known to the handle directory.".dimmed());
    Ok(())
}

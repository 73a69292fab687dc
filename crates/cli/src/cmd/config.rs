//! Configuration management command
//!
//! Shows the effective sync configuration and the config file location.

use anyhow::{Context, Result};
use autosave_core::{example_config, SyncConfig};
use cli_lib::settings::{self, ConfigSource};
use owo_colors::OwoColorize;
use std::path::Path;

fn print_ms(key: &str, value: u64) {
    println!(
        "  {} = {} {}",
        key.cyan(),
        value,
        format!("({:.1}s)", value as f64 / 1000.0).dimmed()
    );
}

fn print_value(key: &str, value: impl std::fmt::Display) {
    println!("  {} = {}", key.cyan(), value);
}

/// List the effective configuration
pub fn run_list(explicit: Option<&Path>) -> Result<()> {
    let (config, source) = settings::load(explicit)?;

    println!("{}", "Sync Configuration".bold());
    match &source {
        ConfigSource::File(path) => {
            println!("{}: {}\n", "Location".dimmed(), path.display().dimmed())
        }
        ConfigSource::Defaults => {
            println!("{}\n", "Using built-in defaults (no config file)".dimmed())
        }
    }

    println!("{}", "[debounce]".yellow());
    print_ms("fields_debounce_ms", config.fields_debounce_ms);
    print_ms("tags_debounce_ms", config.tags_debounce_ms);
    print_ms("handle_check_debounce_ms", config.handle_check_debounce_ms);

    println!("\n{}", "[status]".yellow());
    print_ms("saved_reset_ms", config.saved_reset_ms);
    print_ms("error_reset_ms", config.error_reset_ms);

    println!("\n{}", "[limits]".yellow());
    print_value("handle_min_len", config.handle_min_len);
    print_value("handle_max_len", config.handle_max_len);
    print_value("max_tags", config.max_tags);
    print_value("history_limit", config.history_limit);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  *_debounce_ms: 50-10,000");
    println!("  saved_reset_ms, error_reset_ms: 100-60,000");
    println!("  handle_min_len, handle_max_len: 1-64 (min <= max)");
    println!("  max_tags: 1-32");
    println!("  history_limit: 1-10,000");

    Ok(())
}

/// Show the config file path and optionally create it
pub fn run_path(create: bool) -> Result<()> {
    let config_path =
        settings::config_file_path().context("Could not determine config file path")?;

    if create {
        if settings::init_if_missing(&config_path)? {
            println!("{} Created config file at: {}", "✓".green(), config_path.display());
            return Ok(());
        }
        println!("{}", config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", example_config());
    Ok(())
}

/// Validate a config file, or the default one
pub fn run_check(file: Option<&Path>) -> Result<()> {
    let (config, source) = settings::load(file)?;
    match source {
        ConfigSource::File(path) => {
            println!("{} {} is valid", "✓".green(), path.display());
        }
        ConfigSource::Defaults => {
            println!("{} No config file, built-in defaults apply", "✓".green());
        }
    }
    if config != SyncConfig::default() {
        println!("{}", "Differs from defaults:".dimmed());
        let toml = config.to_toml_string()?;
        let defaults = SyncConfig::default().to_toml_string()?;
        for line in toml.lines().filter(|l| !defaults.lines().any(|d| d == *l)) {
            println!("  {}", line.cyan());
        }
    }
    Ok(())
}

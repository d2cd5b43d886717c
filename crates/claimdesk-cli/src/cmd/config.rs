use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use claimdesk_core::CoordinatorConfig;

use crate::output::{print_json, print_table};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate a coordinator config file
    Check,

    /// Print the effective config (built-in mappings included)
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(path: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> Result<()> {
    let config = match path {
        Some(path) => CoordinatorConfig::load(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    match subcmd {
        ConfigSubcommand::Check => check(&config, json),
        ConfigSubcommand::Show => show(&config, json),
    }
}

fn check(config: &CoordinatorConfig, json: bool) -> Result<()> {
    let mappings = config.action_workflows().count();
    if json {
        print_json(&serde_json::json!({
            "valid": true,
            "claim_mode": config.claim_mode(),
            "action_workflows": mappings,
        }))
    } else {
        println!(
            "Config is valid: claim mode {}, {mappings} action workflow mapping(s).",
            config.claim_mode()
        );
        Ok(())
    }
}

fn show(config: &CoordinatorConfig, json: bool) -> Result<()> {
    let file = config.to_file();
    if json {
        return print_json(&file);
    }
    println!("claim mode: {}", file.claim_mode);
    println!();
    let rows: Vec<Vec<String>> = file
        .action_workflows
        .iter()
        .map(|(action, workflow)| vec![action.clone(), workflow.clone()])
        .collect();
    print_table(&["ACTION", "WORKFLOW"], &rows);
    if !file.type_params.is_empty() {
        println!();
        print!("{}", serde_yaml::to_string(&file.type_params)?);
    }
    Ok(())
}

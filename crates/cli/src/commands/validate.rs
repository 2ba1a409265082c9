//! `validate` command implementation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<ExitCode> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(plan) => {
            if args.json {
                let report = json!({
                    "valid": true,
                    "config": args.config.display().to_string(),
                    "duration_sec": plan.capture.duration_sec,
                    "triggers_enabled": plan.triggers.enabled,
                    "gait_enabled": plan.gait.enabled,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}: OK", args.config.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if args.json {
                let report = json!({
                    "valid": false,
                    "config": args.config.display().to_string(),
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
                // The report already carries the failure; exit non-zero anyway
                Ok(ExitCode::FAILURE)
            } else {
                Err(e).with_context(|| format!("{} is invalid", args.config.display()))
            }
        }
    }
}

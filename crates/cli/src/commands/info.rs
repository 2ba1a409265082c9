//! `info` command implementation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use contracts::RecordingPlan;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<ExitCode> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        println!("{}", config_loader::ConfigLoader::to_json(&plan)?);
    } else {
        print_plan_summary(&plan);
    }

    Ok(ExitCode::SUCCESS)
}

/// Print a configuration summary
pub fn print_plan_summary(plan: &RecordingPlan) {
    println!("\n=== Recording Plan ===\n");
    println!("Session:");
    println!("  Host: {}:{}", plan.session.host, plan.session.port);
    println!("  RT version: {}", plan.session.rt_version);

    println!("\nCapture:");
    println!("  Duration: {}s", plan.capture.duration_sec);
    println!("  Confirm timeout: {}s", plan.capture.confirm_timeout_sec);
    println!("  End lead: {}s", plan.capture.end_lead_sec);
    if let Some(ref output) = plan.capture.output {
        println!("  Output: {}", output.display());
    }

    println!("\nTriggers:");
    if plan.triggers.enabled {
        println!("  Device: {} @ {}", plan.triggers.device, plan.triggers.baud);
        println!("  Pulse width: {}ms", plan.triggers.pulse_ms);
        println!(
            "  Workers: {} (queue {})",
            plan.triggers.workers, plan.triggers.queue_capacity
        );
        let codes = &plan.triggers.codes;
        println!(
            "  Codes: start={} end={} rhs={} rto={} lhs={} lto={}",
            codes.task_start, codes.task_end, codes.rhs, codes.rto, codes.lhs, codes.lto
        );
    } else {
        println!("  Disabled (marker-only dispatch)");
    }

    println!("\nGait detection:");
    if plan.gait.enabled {
        println!("  Threshold: {} N", plan.gait.threshold);
        println!(
            "  Plates: front=ch{} back=ch{}",
            plan.gait.plates.front_channel, plan.gait.plates.back_channel
        );
        println!(
            "  First strike: {}",
            if plan.gait.first_strike_is_right {
                "right"
            } else {
                "left"
            }
        );
    } else {
        println!("  Disabled");
    }

    println!();
}

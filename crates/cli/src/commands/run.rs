//! `run` command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use contracts::{RecordingPlan, TriggerCode};
use lifecycle::{Recording, RecordingConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

/// Exit code reported on user interruption (SIGINT/SIGTERM)
const EXIT_INTERRUPTED: u8 = 130;

/// Execute the `run` command
pub async fn run_recording(args: &RunArgs) -> Result<ExitCode> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut plan = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut plan, args)?;

    // Overrides can invalidate a valid file (duplicate codes, zero duration)
    config_loader::validate(&plan).context("Configuration invalid after CLI overrides")?;

    let output = resolve_output(&plan, args);

    info!(
        host = %plan.session.host,
        port = plan.session.port,
        duration_sec = plan.capture.duration_sec,
        triggers = plan.triggers.enabled,
        gait = plan.gait.enabled,
        output = %output.display(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        super::info::print_plan_summary(&plan);
        return Ok(ExitCode::SUCCESS);
    }

    let recording = Recording::new(RecordingConfig {
        plan,
        output,
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        mock: args.mock,
    });

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting recording...");

    tokio::select! {
        result = recording.run() => {
            let stats = result.context("Recording failed")?;
            info!(
                final_state = %stats.final_state,
                duration_secs = stats.duration.as_secs_f64(),
                events = stats.events.total,
                "Recording completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping recording...");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    }

    info!("triggersync finished");
    Ok(ExitCode::SUCCESS)
}

/// Apply CLI overrides onto the loaded plan
fn apply_overrides(plan: &mut RecordingPlan, args: &RunArgs) -> Result<()> {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding capture host from CLI");
        plan.session.host = host.clone();
    }
    if let Some(port) = args.port {
        plan.session.port = port;
    }
    if let Some(duration) = args.duration {
        plan.capture.duration_sec = duration;
    }
    if args.triggers {
        plan.triggers.enabled = true;
    }
    if args.gait {
        plan.gait.enabled = true;
    }

    let code_overrides = [
        ("--start-code", args.start_code, &mut plan.triggers.codes.task_start),
        ("--end-code", args.end_code, &mut plan.triggers.codes.task_end),
        ("--rhs-code", args.rhs_code, &mut plan.triggers.codes.rhs),
        ("--rto-code", args.rto_code, &mut plan.triggers.codes.rto),
        ("--lhs-code", args.lhs_code, &mut plan.triggers.codes.lhs),
        ("--lto-code", args.lto_code, &mut plan.triggers.codes.lto),
    ];
    for (flag, value, slot) in code_overrides {
        if let Some(raw) = value {
            *slot = TriggerCode::new(raw)
                .map_err(|e| CliError::invalid_override(flag, e.to_string()))?;
        }
    }

    Ok(())
}

/// Resolve the output path: explicit flag, then plan, then subject/task name
fn resolve_output(plan: &RecordingPlan, args: &RunArgs) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }
    if let Some(ref output) = plan.capture.output {
        return output.clone();
    }
    PathBuf::from(format!("sub-{}_task-{}.qtm", args.subject, args.task))
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

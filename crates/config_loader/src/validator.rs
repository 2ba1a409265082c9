//! Configuration validation
//!
//! Rules:
//! - capture duration > 0, end lead >= 0 and < duration
//! - confirm timeout > 0
//! - pulse width > 0, worker pool >= 1, queue capacity >= 1
//! - trigger codes pairwise distinct (the line is a shared resource)
//! - front/back plate channels distinct
//! - threshold finite and > 0

use std::collections::HashSet;

use contracts::{ContractError, RecordingPlan};

/// Validate a RecordingPlan
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(plan: &RecordingPlan) -> Result<(), ContractError> {
    validate_capture(plan)?;
    validate_triggers(plan)?;
    validate_gait(plan)?;
    Ok(())
}

fn validate_capture(plan: &RecordingPlan) -> Result<(), ContractError> {
    let capture = &plan.capture;

    if !(capture.duration_sec > 0.0) || !capture.duration_sec.is_finite() {
        return Err(ContractError::config_validation(
            "capture.duration_sec",
            format!("duration must be > 0, got {}", capture.duration_sec),
        ));
    }

    if capture.end_lead_sec < 0.0 || !capture.end_lead_sec.is_finite() {
        return Err(ContractError::config_validation(
            "capture.end_lead_sec",
            format!("end lead must be >= 0, got {}", capture.end_lead_sec),
        ));
    }

    if capture.end_lead_sec >= capture.duration_sec {
        return Err(ContractError::config_validation(
            "capture.end_lead_sec",
            format!(
                "end lead ({}) must be < duration ({})",
                capture.end_lead_sec, capture.duration_sec
            ),
        ));
    }

    if !(capture.confirm_timeout_sec > 0.0) {
        return Err(ContractError::config_validation(
            "capture.confirm_timeout_sec",
            format!(
                "confirm timeout must be > 0, got {}",
                capture.confirm_timeout_sec
            ),
        ));
    }

    Ok(())
}

fn validate_triggers(plan: &RecordingPlan) -> Result<(), ContractError> {
    let triggers = &plan.triggers;

    if triggers.pulse_ms == 0 {
        return Err(ContractError::config_validation(
            "triggers.pulse_ms",
            "pulse width must be > 0",
        ));
    }

    if triggers.workers == 0 {
        return Err(ContractError::config_validation(
            "triggers.workers",
            "worker pool must have at least 1 worker",
        ));
    }

    if triggers.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "triggers.queue_capacity",
            "queue capacity must be >= 1",
        ));
    }

    let mut seen = HashSet::new();
    for code in triggers.codes.codes() {
        if !seen.insert(code.value()) {
            return Err(ContractError::config_validation(
                "triggers.codes",
                format!("trigger codes must be pairwise distinct, {code} appears twice"),
            ));
        }
    }

    if triggers.enabled && triggers.device.is_empty() {
        return Err(ContractError::config_validation(
            "triggers.device",
            "device path cannot be empty when triggers are enabled",
        ));
    }

    Ok(())
}

fn validate_gait(plan: &RecordingPlan) -> Result<(), ContractError> {
    let gait = &plan.gait;

    if !gait.threshold.is_finite() || gait.threshold <= 0.0 {
        return Err(ContractError::config_validation(
            "gait.threshold",
            format!("threshold must be finite and > 0, got {}", gait.threshold),
        ));
    }

    if gait.plates.front_channel == gait.plates.back_channel {
        return Err(ContractError::config_validation(
            "gait.plates",
            format!(
                "front and back plate channels must be distinct, both are {}",
                gait.plates.front_channel
            ),
        ));
    }

    Ok(())
}

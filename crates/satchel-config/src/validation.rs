//! Configuration validation

use crate::schema::RawConfig;
use satchel_util::MotionConfidence;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("'{field}' must be a positive number of seconds")]
    ZeroDuration { field: &'static str },

    #[error("Invalid confidence grade: {0}")]
    InvalidConfidence(String),

    #[error("Geofence radius must be a positive finite number of meters, got {0}")]
    InvalidRadius(f64),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let durations = [
        (
            "session.default_planned_duration_seconds",
            config.session.default_planned_duration_seconds,
        ),
        (
            "motion.stationary_settle_seconds",
            config.motion.stationary_settle_seconds,
        ),
        (
            "accessory.disconnect_grace_seconds",
            config.accessory.disconnect_grace_seconds,
        ),
    ];
    for (field, value) in durations {
        if value == Some(0) {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    if let Some(confidence) = &config.motion.min_confidence
        && let Err(e) = parse_confidence(confidence)
    {
        errors.push(ValidationError::InvalidConfidence(e));
    }

    if let Some(radius) = config.geofence.radius_meters
        && !(radius.is_finite() && radius > 0.0)
    {
        errors.push(ValidationError::InvalidRadius(radius));
    }

    errors
}

/// Parse a confidence grade name
pub fn parse_confidence(s: &str) -> Result<MotionConfidence, String> {
    match s.to_lowercase().as_str() {
        "low" => Ok(MotionConfidence::Low),
        "medium" => Ok(MotionConfidence::Medium),
        "high" => Ok(MotionConfidence::High),
        other => Err(format!("Unknown confidence grade: {}", other)),
    }
}

//! Validated policy structures

use crate::schema::RawConfig;
use crate::validation::parse_confidence;
use satchel_util::MotionConfidence;
use std::time::Duration;

/// Validated tuning ready for use by the arbitration core
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub session: SessionPolicy,
    pub motion: MotionPolicy,
    pub accessory: AccessoryPolicy,
    pub geofence: GeofencePolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            session: SessionPolicy {
                default_planned_duration: raw
                    .session
                    .default_planned_duration_seconds
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| SessionPolicy::default().default_planned_duration),
            },
            motion: MotionPolicy {
                stationary_settle: raw
                    .motion
                    .stationary_settle_seconds
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| MotionPolicy::default().stationary_settle),
                min_confidence: raw
                    .motion
                    .min_confidence
                    .as_deref()
                    .and_then(|s| parse_confidence(s).ok())
                    .unwrap_or_else(|| MotionPolicy::default().min_confidence),
            },
            accessory: AccessoryPolicy {
                disconnect_grace: raw
                    .accessory
                    .disconnect_grace_seconds
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| AccessoryPolicy::default().disconnect_grace),
            },
            geofence: GeofencePolicy {
                radius_meters: raw
                    .geofence
                    .radius_meters
                    .unwrap_or_else(|| GeofencePolicy::default().radius_meters),
            },
        }
    }
}

/// Session defaults
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Planned duration used when the caller does not supply one
    pub default_planned_duration: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            default_planned_duration: Duration::from_secs(3600),
        }
    }
}

/// Motion source tuning
#[derive(Debug, Clone)]
pub struct MotionPolicy {
    /// How long stationary must hold uncontested before it qualifies
    pub stationary_settle: Duration,

    /// Samples below this grade are ignored entirely
    pub min_confidence: MotionConfidence,
}

impl Default for MotionPolicy {
    fn default() -> Self {
        Self {
            stationary_settle: Duration::from_secs(30),
            min_confidence: MotionConfidence::Low,
        }
    }
}

/// Accessory source tuning
#[derive(Debug, Clone)]
pub struct AccessoryPolicy {
    /// How long a disconnect must hold before it qualifies
    pub disconnect_grace: Duration,
}

impl Default for AccessoryPolicy {
    fn default() -> Self {
        Self {
            disconnect_grace: Duration::from_secs(10),
        }
    }
}

/// Geofence source tuning
#[derive(Debug, Clone)]
pub struct GeofencePolicy {
    /// Radius of the region established around the session start point
    pub radius_meters: f64,
}

impl Default for GeofencePolicy {
    fn default() -> Self {
        Self {
            radius_meters: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_values() {
        let policy = Policy::default();
        assert_eq!(policy.motion.stationary_settle, Duration::from_secs(30));
        assert_eq!(policy.accessory.disconnect_grace, Duration::from_secs(10));
        assert_eq!(policy.motion.min_confidence, MotionConfidence::Low);
        assert_eq!(policy.geofence.radius_meters, 50.0);
        assert_eq!(
            policy.session.default_planned_duration,
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn from_raw_applies_overrides() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1

            [motion]
            stationary_settle_seconds = 60
            min_confidence = "high"
        "#,
        )
        .unwrap();

        let policy = Policy::from_raw(raw);
        assert_eq!(policy.motion.stationary_settle, Duration::from_secs(60));
        assert_eq!(policy.motion.min_confidence, MotionConfidence::High);
        // Untouched sections keep their defaults
        assert_eq!(policy.accessory.disconnect_grace, Duration::from_secs(10));
    }
}

//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Session defaults
    #[serde(default)]
    pub session: RawSessionConfig,

    /// Motion source tuning
    #[serde(default)]
    pub motion: RawMotionConfig,

    /// Accessory source tuning
    #[serde(default)]
    pub accessory: RawAccessoryConfig,

    /// Geofence source tuning
    #[serde(default)]
    pub geofence: RawGeofenceConfig,
}

/// Session defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Planned duration used when the caller does not supply one
    pub default_planned_duration_seconds: Option<u64>,
}

/// Motion source tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMotionConfig {
    /// How long stationary must hold uncontested before it qualifies
    pub stationary_settle_seconds: Option<u64>,

    /// Confidence floor: "low", "medium", or "high". Samples below the
    /// floor are ignored entirely.
    pub min_confidence: Option<String>,
}

/// Accessory source tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAccessoryConfig {
    /// How long a disconnect must hold before it qualifies
    pub disconnect_grace_seconds: Option<u64>,
}

/// Geofence source tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGeofenceConfig {
    /// Radius of the region established around the session start point
    pub radius_meters: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections() {
        let toml_str = r#"
            config_version = 1

            [motion]
            stationary_settle_seconds = 30
            min_confidence = "high"

            [geofence]
            radius_meters = 100.0
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.motion.stationary_settle_seconds, Some(30));
        assert_eq!(config.motion.min_confidence.as_deref(), Some("high"));
        assert_eq!(config.geofence.radius_meters, Some(100.0));
        // Missing sections fall back to empty defaults
        assert_eq!(config.accessory.disconnect_grace_seconds, None);
        assert_eq!(config.session.default_planned_duration_seconds, None);
    }
}

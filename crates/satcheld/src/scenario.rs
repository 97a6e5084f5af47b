//! Scenario timelines for replay
//!
//! A scenario is a TOML file describing one session plus a timeline of
//! provider observations and control actions at millisecond offsets.
//! Fields the scenario leaves out fall back to the loaded policy.

use anyhow::{Context, Result};
use satchel_config::Policy;
use satchel_core::SessionPlan;
use satchel_providers::{GeoPoint, RegionSpec};
use satchel_util::{MotionConfidence, PeripheralId};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub session: SessionSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Session parameters. Omitted fields use the policy defaults; a
/// geofence is only set up when both coordinates are present.
#[derive(Debug, Deserialize)]
pub struct SessionSpec {
    pub planned_duration_seconds: Option<u64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub peripherals: Vec<String>,
}

/// One timeline entry, replayed at `at_ms` after session start
#[derive(Debug, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Deliver a motion activity sample
    Motion {
        #[serde(default)]
        stationary: bool,
        #[serde(default)]
        automotive: bool,
        confidence: MotionConfidence,
    },
    /// Report a watched accessory as connected
    AccessoryConnect { peripheral: String },
    /// Report a watched accessory as disconnected
    AccessoryDisconnect { peripheral: String },
    /// Deliver an exit crossing for the session's region
    GeofenceExit,
    Pause,
    Resume,
    ManualStop,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Build the session plan, filling gaps from the policy.
    pub fn plan(&self, policy: &Policy) -> SessionPlan {
        let planned_duration = self
            .session
            .planned_duration_seconds
            .map(Duration::from_secs)
            .unwrap_or(policy.session.default_planned_duration);

        let region = match (self.session.latitude, self.session.longitude) {
            (Some(latitude), Some(longitude)) => Some(RegionSpec::new(
                GeoPoint::new(latitude, longitude),
                policy.geofence.radius_meters,
            )),
            _ => None,
        };

        let peripherals = self
            .session
            .peripherals
            .iter()
            .map(|p| PeripheralId::new(p.as_str()))
            .collect();

        SessionPlan {
            planned_duration,
            region,
            peripherals,
        }
    }
}

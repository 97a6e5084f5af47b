//! Raw observation types delivered by providers

use chrono::{DateTime, Local};
use satchel_util::{MotionConfidence, PeripheralId, RegionId, now};
use serde::{Deserialize, Serialize};

/// A geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A circular region to monitor for exit crossings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl RegionSpec {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }
}

/// Direction of a geofence boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossing {
    Entered,
    Exited,
}

/// One geofence crossing report from the location provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceObservation {
    pub region: RegionId,
    pub crossing: Crossing,
    pub at: DateTime<Local>,
}

impl GeofenceObservation {
    pub fn exited(region: RegionId) -> Self {
        Self {
            region,
            crossing: Crossing::Exited,
            at: now(),
        }
    }

    pub fn entered(region: RegionId) -> Self {
        Self {
            region,
            crossing: Crossing::Entered,
            at: now(),
        }
    }
}

/// One activity classification sample from the motion provider.
/// Classifications are not mutually exclusive in the raw feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActivitySample {
    pub automotive: bool,
    pub stationary: bool,
    pub walking: bool,
    pub running: bool,
    pub cycling: bool,
    pub confidence: MotionConfidence,
    pub at: DateTime<Local>,
}

impl ActivitySample {
    pub fn new(confidence: MotionConfidence) -> Self {
        Self {
            automotive: false,
            stationary: false,
            walking: false,
            running: false,
            cycling: false,
            confidence,
            at: now(),
        }
    }

    pub fn stationary(confidence: MotionConfidence) -> Self {
        Self {
            stationary: true,
            ..Self::new(confidence)
        }
    }

    pub fn walking(confidence: MotionConfidence) -> Self {
        Self {
            walking: true,
            ..Self::new(confidence)
        }
    }

    pub fn automotive(confidence: MotionConfidence) -> Self {
        Self {
            automotive: true,
            ..Self::new(confidence)
        }
    }

    pub fn cycling(confidence: MotionConfidence) -> Self {
        Self {
            cycling: true,
            ..Self::new(confidence)
        }
    }
}

/// Connection edge for a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessoryEvent {
    Connected,
    Disconnected,
}

/// One connect/disconnect report from the accessory provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryObservation {
    pub peripheral: PeripheralId,
    pub event: AccessoryEvent,
    pub at: DateTime<Local>,
}

impl AccessoryObservation {
    pub fn connected(peripheral: impl Into<PeripheralId>) -> Self {
        Self {
            peripheral: peripheral.into(),
            event: AccessoryEvent::Connected,
            at: now(),
        }
    }

    pub fn disconnected(peripheral: impl Into<PeripheralId>) -> Self {
        Self {
            peripheral: peripheral.into(),
            event: AccessoryEvent::Disconnected,
            at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_sample_builders() {
        let s = ActivitySample::stationary(MotionConfidence::High);
        assert!(s.stationary);
        assert!(!s.walking);
        assert!(!s.automotive);

        let w = ActivitySample::walking(MotionConfidence::Low);
        assert!(w.walking);
        assert!(!w.stationary);
    }

    #[test]
    fn observations_serialize() {
        let obs = AccessoryObservation::disconnected("airpods");
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("disconnected"));

        let obs = GeofenceObservation::exited(RegionId::new());
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("exited"));
    }
}

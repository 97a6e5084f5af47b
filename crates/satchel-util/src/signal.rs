//! Signal kinds: the categories of condition that can end a session

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of environmental signal a source can qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Timer,
    Geofence,
    Motion,
    Accessory,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Timer => "timer",
            SignalKind::Geofence => "geofence",
            SignalKind::Motion => "motion",
            SignalKind::Accessory => "accessory",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What ended a completed session: one of the four environmental signals,
/// or a user-initiated stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndSignal {
    Timer,
    Geofence,
    Motion,
    Accessory,
    Manual,
}

impl EndSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndSignal::Timer => "timer",
            EndSignal::Geofence => "geofence",
            EndSignal::Motion => "motion",
            EndSignal::Accessory => "accessory",
            EndSignal::Manual => "manual",
        }
    }
}

impl fmt::Display for EndSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SignalKind> for EndSignal {
    fn from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Timer => EndSignal::Timer,
            SignalKind::Geofence => EndSignal::Geofence,
            SignalKind::Motion => EndSignal::Motion,
            SignalKind::Accessory => EndSignal::Accessory,
        }
    }
}

/// Confidence grade attached to motion activity classifications.
/// Ordered so a configured floor can be compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionConfidence {
    Low,
    Medium,
    High,
}

impl MotionConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionConfidence::Low => "low",
            MotionConfidence::Medium => "medium",
            MotionConfidence::High => "high",
        }
    }
}

impl fmt::Display for MotionConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_signal_from_kind() {
        assert_eq!(EndSignal::from(SignalKind::Timer), EndSignal::Timer);
        assert_eq!(EndSignal::from(SignalKind::Geofence), EndSignal::Geofence);
        assert_eq!(EndSignal::from(SignalKind::Motion), EndSignal::Motion);
        assert_eq!(EndSignal::from(SignalKind::Accessory), EndSignal::Accessory);
    }

    #[test]
    fn confidence_ordering() {
        assert!(MotionConfidence::Low < MotionConfidence::Medium);
        assert!(MotionConfidence::Medium < MotionConfidence::High);
        // Floor comparisons used by the motion source
        assert!(MotionConfidence::High >= MotionConfidence::Low);
        assert!(!(MotionConfidence::Low >= MotionConfidence::Medium));
    }

    #[test]
    fn signal_kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&SignalKind::Accessory).unwrap(),
            "\"accessory\""
        );
        assert_eq!(
            serde_json::to_string(&EndSignal::Manual).unwrap(),
            "\"manual\""
        );
        let parsed: MotionConfidence = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, MotionConfidence::Medium);
    }
}

//! Provider traits

use async_trait::async_trait;
use satchel_util::{EndSignal, PeripheralId, RegionId, SessionId};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{AccessoryObservation, ActivitySample, GeofenceObservation, RegionSpec};

/// Errors from provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Delivers geofence crossing observations.
///
/// A geofence must be established before its crossings are reported;
/// `establish_geofence` returns the region id that subsequent
/// observations carry. Each `subscribe` call returns a fresh receiver so
/// a source restarted after a pause can re-attach.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Begin monitoring a circular region, returning its id
    async fn establish_geofence(&self, spec: RegionSpec) -> ProviderResult<RegionId>;

    /// Stop monitoring a previously established region
    async fn clear_geofence(&self, region: &RegionId) -> ProviderResult<()>;

    /// Subscribe to crossing observations
    fn subscribe(&self) -> mpsc::UnboundedReceiver<GeofenceObservation>;
}

/// Delivers a continuous stream of activity classification samples
pub trait MotionActivityProvider: Send + Sync {
    /// Subscribe to activity samples
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ActivitySample>;
}

/// Delivers connect/disconnect observations for paired peripherals
#[async_trait]
pub trait AccessoryConnectionProvider: Send + Sync {
    /// Snapshot of peripherals currently connected
    async fn connected_peripherals(&self) -> ProviderResult<Vec<PeripheralId>>;

    /// Subscribe to connection observations
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AccessoryObservation>;
}

/// Receives the single completion decision per session.
/// Delivery mechanics (local push, in-app banner) are the implementor's
/// concern; errors are logged by the caller and never affect arbitration.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify_session_ended(
        &self,
        session_id: SessionId,
        end_signal: EndSignal,
    ) -> ProviderResult<()>;
}

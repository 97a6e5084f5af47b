//! Mock providers for unit/integration testing and the development harness

use async_trait::async_trait;
use satchel_util::{EndSignal, PeripheralId, RegionId, SessionId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    AccessoryConnectionProvider, AccessoryObservation, ActivitySample, GeofenceObservation,
    LocationProvider, MotionActivityProvider, NotificationDispatcher, ProviderError,
    ProviderResult, RegionSpec,
};

/// Fan-out of observations to every live subscriber. Sources re-subscribe
/// after a pause, so providers hand out a fresh receiver per call; dead
/// receivers are pruned on send.
struct Fanout<T> {
    senders: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Fanout<T> {
    fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }

    fn send(&self, value: T) {
        self.senders
            .lock()
            .unwrap()
            .retain(|tx| tx.send(value.clone()).is_ok());
    }
}

/// Mock location provider
pub struct MockLocationProvider {
    events: Fanout<GeofenceObservation>,
    regions: Mutex<Vec<RegionId>>,

    /// Configure establish_geofence to fail with permission denied
    pub fail_establish: Arc<Mutex<bool>>,

    /// Latency applied inside establish_geofence after the region is
    /// registered, for racing teardown against in-flight establishment
    pub establish_latency: Arc<Mutex<Option<Duration>>>,
}

impl MockLocationProvider {
    pub fn new() -> Self {
        Self {
            events: Fanout::new(),
            regions: Mutex::new(Vec::new()),
            fail_establish: Arc::new(Mutex::new(false)),
            establish_latency: Arc::new(Mutex::new(None)),
        }
    }

    /// Regions currently being monitored, oldest first
    pub fn established_regions(&self) -> Vec<RegionId> {
        self.regions.lock().unwrap().clone()
    }

    /// Deliver an exit crossing for the most recently established region
    pub fn simulate_exit(&self) {
        if let Some(region) = self.regions.lock().unwrap().last().copied() {
            self.events.send(GeofenceObservation::exited(region));
        }
    }

    /// Deliver an exit crossing for a specific region
    pub fn simulate_exit_for(&self, region: RegionId) {
        self.events.send(GeofenceObservation::exited(region));
    }

    /// Deliver an enter crossing for the most recently established region
    pub fn simulate_enter(&self) {
        if let Some(region) = self.regions.lock().unwrap().last().copied() {
            self.events.send(GeofenceObservation::entered(region));
        }
    }

    /// Deliver an exit crossing for a region this provider never
    /// established (a stale trigger from a previous session)
    pub fn simulate_stale_exit(&self) {
        self.events.send(GeofenceObservation::exited(RegionId::new()));
    }
}

impl Default for MockLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for MockLocationProvider {
    async fn establish_geofence(&self, _spec: RegionSpec) -> ProviderResult<RegionId> {
        if *self.fail_establish.lock().unwrap() {
            return Err(ProviderError::PermissionDenied(
                "Mock location permission denied".into(),
            ));
        }

        let region = RegionId::new();
        self.regions.lock().unwrap().push(region);

        let latency = *self.establish_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(region)
    }

    async fn clear_geofence(&self, region: &RegionId) -> ProviderResult<()> {
        self.regions.lock().unwrap().retain(|r| r != region);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<GeofenceObservation> {
        self.events.subscribe()
    }
}

/// Mock motion activity provider
pub struct MockMotionProvider {
    events: Fanout<ActivitySample>,
}

impl MockMotionProvider {
    pub fn new() -> Self {
        Self {
            events: Fanout::new(),
        }
    }

    /// Deliver one activity sample to all subscribers
    pub fn push(&self, sample: ActivitySample) {
        self.events.send(sample);
    }
}

impl Default for MockMotionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionActivityProvider for MockMotionProvider {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ActivitySample> {
        self.events.subscribe()
    }
}

/// Mock accessory provider
pub struct MockAccessoryProvider {
    events: Fanout<AccessoryObservation>,
    connected: Mutex<Vec<PeripheralId>>,

    /// Configure connected_peripherals to fail
    pub fail_snapshot: Arc<Mutex<bool>>,
}

impl MockAccessoryProvider {
    pub fn new() -> Self {
        Self {
            events: Fanout::new(),
            connected: Mutex::new(Vec::new()),
            fail_snapshot: Arc::new(Mutex::new(false)),
        }
    }

    /// Construct with peripherals already connected
    pub fn with_connected(peripherals: impl IntoIterator<Item = PeripheralId>) -> Self {
        let provider = Self::new();
        *provider.connected.lock().unwrap() = peripherals.into_iter().collect();
        provider
    }

    /// Deliver a connect observation and track the peripheral as connected
    pub fn simulate_connect(&self, peripheral: impl Into<PeripheralId>) {
        let peripheral = peripheral.into();
        {
            let mut connected = self.connected.lock().unwrap();
            if !connected.contains(&peripheral) {
                connected.push(peripheral.clone());
            }
        }
        self.events.send(AccessoryObservation::connected(peripheral));
    }

    /// Deliver a disconnect observation
    pub fn simulate_disconnect(&self, peripheral: impl Into<PeripheralId>) {
        let peripheral = peripheral.into();
        self.connected.lock().unwrap().retain(|p| p != &peripheral);
        self.events
            .send(AccessoryObservation::disconnected(peripheral));
    }
}

impl Default for MockAccessoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessoryConnectionProvider for MockAccessoryProvider {
    async fn connected_peripherals(&self) -> ProviderResult<Vec<PeripheralId>> {
        if *self.fail_snapshot.lock().unwrap() {
            return Err(ProviderError::Unavailable(
                "Mock accessory snapshot failure".into(),
            ));
        }
        Ok(self.connected.lock().unwrap().clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<AccessoryObservation> {
        self.events.subscribe()
    }
}

/// Records every completion notification for exactly-once assertions
pub struct RecordingDispatcher {
    notifications: Mutex<Vec<(SessionId, EndSignal)>>,

    /// Configure notify_session_ended to fail
    pub fail_notify: Arc<Mutex<bool>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            fail_notify: Arc::new(Mutex::new(false)),
        }
    }

    pub fn notifications(&self) -> Vec<(SessionId, EndSignal)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn notify_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify_session_ended(
        &self,
        session_id: SessionId,
        end_signal: EndSignal,
    ) -> ProviderResult<()> {
        if *self.fail_notify.lock().unwrap() {
            return Err(ProviderError::Internal("Mock dispatch failure".into()));
        }
        self.notifications
            .lock()
            .unwrap()
            .push((session_id, end_signal));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessoryEvent;
    use satchel_util::MotionConfidence;

    #[tokio::test]
    async fn location_establish_and_exit() {
        let provider = MockLocationProvider::new();
        let mut rx = provider.subscribe();

        let region = provider
            .establish_geofence(RegionSpec::new(crate::GeoPoint::new(37.79, -122.40), 50.0))
            .await
            .unwrap();
        provider.simulate_exit();

        let obs = rx.recv().await.unwrap();
        assert_eq!(obs.region, region);
        assert_eq!(obs.crossing, crate::Crossing::Exited);
    }

    #[tokio::test]
    async fn location_establish_failure() {
        let provider = MockLocationProvider::new();
        *provider.fail_establish.lock().unwrap() = true;

        let result = provider
            .establish_geofence(RegionSpec::new(crate::GeoPoint::new(0.0, 0.0), 10.0))
            .await;
        assert!(matches!(result, Err(ProviderError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn fanout_reaches_every_subscriber() {
        let provider = MockMotionProvider::new();
        let mut rx1 = provider.subscribe();
        let mut rx2 = provider.subscribe();

        provider.push(ActivitySample::stationary(MotionConfidence::High));

        assert!(rx1.recv().await.unwrap().stationary);
        assert!(rx2.recv().await.unwrap().stationary);
    }

    #[tokio::test]
    async fn fanout_prunes_dropped_subscribers() {
        let provider = MockMotionProvider::new();
        let rx1 = provider.subscribe();
        let mut rx2 = provider.subscribe();
        drop(rx1);

        provider.push(ActivitySample::walking(MotionConfidence::Low));
        assert!(rx2.recv().await.unwrap().walking);
    }

    #[tokio::test]
    async fn accessory_snapshot_tracks_connections() {
        let provider = MockAccessoryProvider::with_connected([PeripheralId::new("watch")]);
        let mut rx = provider.subscribe();

        assert_eq!(provider.connected_peripherals().await.unwrap().len(), 1);

        provider.simulate_connect("airpods");
        assert_eq!(provider.connected_peripherals().await.unwrap().len(), 2);

        provider.simulate_disconnect("watch");
        assert_eq!(provider.connected_peripherals().await.unwrap().len(), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, AccessoryEvent::Connected);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.event, AccessoryEvent::Disconnected);
        assert_eq!(second.peripheral.as_str(), "watch");
    }

    #[tokio::test]
    async fn recording_dispatcher_counts() {
        let dispatcher = RecordingDispatcher::new();
        let id = SessionId::new();

        dispatcher
            .notify_session_ended(id, EndSignal::Geofence)
            .await
            .unwrap();

        assert_eq!(dispatcher.notify_count(), 1);
        assert_eq!(dispatcher.notifications()[0], (id, EndSignal::Geofence));
    }
}

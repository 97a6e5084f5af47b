//! End-to-end walkthroughs of the canonical session endings, run
//! against the default policy with paused virtual time.

use satchel_config::Policy;
use satchel_core::{ArbitrationEngine, SessionEvent, SessionPlan, SessionState};
use satchel_providers::{
    ActivitySample, GeoPoint, MockAccessoryProvider, MockLocationProvider, MockMotionProvider,
    RecordingDispatcher, RegionSpec,
};
use satchel_util::{EndSignal, MotionConfidence, PeripheralId};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    engine: Arc<ArbitrationEngine>,
    location: Arc<MockLocationProvider>,
    motion: Arc<MockMotionProvider>,
    accessory: Arc<MockAccessoryProvider>,
    dispatcher: Arc<RecordingDispatcher>,
}

fn make_harness(accessory: MockAccessoryProvider) -> Harness {
    let location = Arc::new(MockLocationProvider::new());
    let motion = Arc::new(MockMotionProvider::new());
    let accessory = Arc::new(accessory);
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = Arc::new(ArbitrationEngine::new(
        Policy::default(),
        location.clone(),
        motion.clone(),
        accessory.clone(),
        dispatcher.clone(),
    ));
    Harness {
        engine,
        location,
        motion,
        accessory,
        dispatcher,
    }
}

fn count_qualified(events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) -> usize {
    let mut qualified = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::SignalQualified { .. }) {
            qualified += 1;
        }
    }
    qualified
}

/// Let spawned sources reach their subscribe/select points.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn timer_only_session_completes_at_planned_duration() {
    let h = make_harness(MockAccessoryProvider::new());
    let id = h
        .engine
        .start_session(SessionPlan {
            planned_duration: Duration::from_secs(60),
            region: None,
            peripherals: Vec::new(),
        })
        .unwrap();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Active);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = h.engine.snapshot(id).unwrap();
    assert_eq!(snapshot.state, SessionState::Completed);
    assert_eq!(snapshot.end_signal, Some(EndSignal::Timer));
    assert!(snapshot.active_duration >= Duration::from_secs(60));
    assert_eq!(h.dispatcher.notifications(), vec![(id, EndSignal::Timer)]);
}

#[tokio::test(start_paused = true)]
async fn sustained_stillness_completes_with_motion() {
    let h = make_harness(MockAccessoryProvider::new());
    let id = h
        .engine
        .start_session(SessionPlan {
            planned_duration: Duration::from_secs(3600),
            region: None,
            peripherals: Vec::new(),
        })
        .unwrap();
    settle().await;

    // Default policy: permissive confidence floor, 30s settle window
    h.motion.push(ActivitySample::stationary(MotionConfidence::Low));
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Active);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Completed);
    assert_eq!(h.engine.end_signal(id).unwrap(), Some(EndSignal::Motion));
}

#[tokio::test(start_paused = true)]
async fn interrupted_stillness_qualifies_only_at_second_window() {
    let h = make_harness(MockAccessoryProvider::new());
    let mut events = h.engine.take_events().await.unwrap();
    let id = h
        .engine
        .start_session(SessionPlan {
            planned_duration: Duration::from_secs(3600),
            region: None,
            peripherals: Vec::new(),
        })
        .unwrap();
    settle().await;

    h.motion.push(ActivitySample::stationary(MotionConfidence::High));
    tokio::time::sleep(Duration::from_secs(25)).await;
    h.motion.push(ActivitySample::walking(MotionConfidence::High));
    tokio::time::sleep(Duration::from_secs(15)).await;
    h.motion.push(ActivitySample::stationary(MotionConfidence::High));

    // First window was cut short at 25s; nothing qualified from it
    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Active);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Completed);
    assert_eq!(h.engine.end_signal(id).unwrap(), Some(EndSignal::Motion));

    // Two settle windows observed, exactly one qualification
    assert_eq!(count_qualified(&mut events), 1);
    assert_eq!(h.dispatcher.notify_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_within_grace_then_sustained_disconnect() {
    let h = make_harness(MockAccessoryProvider::with_connected([PeripheralId::new(
        "airtag-satchel",
    )]));
    let mut events = h.engine.take_events().await.unwrap();
    let id = h
        .engine
        .start_session(SessionPlan {
            planned_duration: Duration::from_secs(3600),
            region: None,
            peripherals: vec![PeripheralId::new("airtag-satchel")],
        })
        .unwrap();
    settle().await;

    // First disconnect is regrasped at 8s, inside the 10s grace
    h.accessory.simulate_disconnect("airtag-satchel");
    tokio::time::sleep(Duration::from_secs(8)).await;
    h.accessory.simulate_connect("airtag-satchel");
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Active);

    // Second disconnect holds through the full grace window
    h.accessory.simulate_disconnect("airtag-satchel");
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Active);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.engine.session_state(id).unwrap(), SessionState::Completed);
    assert_eq!(h.engine.end_signal(id).unwrap(), Some(EndSignal::Accessory));
    assert_eq!(count_qualified(&mut events), 1);
    assert_eq!(h.dispatcher.notify_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn simultaneous_geofence_exit_and_timer_expiry_single_winner() {
    let h = make_harness(MockAccessoryProvider::new());
    let mut events = h.engine.take_events().await.unwrap();
    let id = h
        .engine
        .start_session(SessionPlan {
            planned_duration: Duration::from_secs(60),
            region: Some(RegionSpec::new(GeoPoint::new(37.7885, -122.4008), 50.0)),
            peripherals: Vec::new(),
        })
        .unwrap();

    // Land on the timer's exact deadline and deliver the exit crossing
    // in the same instant, before either signal has been processed
    tokio::time::sleep(Duration::from_secs(60)).await;
    h.location.simulate_exit();
    settle().await;

    let snapshot = h.engine.snapshot(id).unwrap();
    assert_eq!(snapshot.state, SessionState::Completed);
    let winner = snapshot.end_signal.unwrap();
    assert!(
        winner == EndSignal::Timer || winner == EndSignal::Geofence,
        "unexpected winner: {winner}"
    );

    // Exactly one completion regardless of which signal won the race
    assert_eq!(h.dispatcher.notify_count(), 1);
    let completions = {
        let mut completions = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::SessionCompleted { .. }) {
                completions += 1;
            }
        }
        completions
    };
    assert_eq!(completions, 1);
    assert!(h.location.established_regions().is_empty());
}

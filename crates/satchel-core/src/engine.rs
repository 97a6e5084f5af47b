//! End-signal arbitration engine

use crate::sources::{self, RegionSlot, SourceContext};
use crate::{
    CompletionOutcome, EngineResult, QualifiedSignal, SessionEvent, SessionLifecycle, SessionPlan,
    SessionSnapshot, SessionState,
};
use satchel_config::Policy;
use satchel_providers::{
    AccessoryConnectionProvider, LocationProvider, MotionActivityProvider, NotificationDispatcher,
};
use satchel_util::{EndSignal, MonotonicInstant, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Source tasks running for one session's current active span
struct SourceEntry {
    tasks: Vec<JoinHandle<()>>,
    /// Region id the geofence source established, if it got that far.
    /// Teardown clears it with the provider, or marks the slot so a
    /// still-in-flight establishment cleans up after itself.
    established_region: Arc<Mutex<RegionSlot>>,
}

/// The arbitration engine.
///
/// Owns the session registry, runs one set of signal source tasks per
/// active session, and funnels their qualified signals through a
/// per-session arbiter so that each session completes at most once,
/// with exactly one recorded end signal, no matter how many signals
/// race. Pause aborts the sources and bumps the session epoch; resume
/// spawns fresh ones, with the timer carrying only the unspent
/// remainder of the planned duration.
pub struct ArbitrationEngine {
    policy: Policy,
    lifecycle: Arc<SessionLifecycle>,
    location: Arc<dyn LocationProvider>,
    motion: Arc<dyn MotionActivityProvider>,
    accessory: Arc<dyn AccessoryConnectionProvider>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    active: Arc<Mutex<HashMap<SessionId, SourceEntry>>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>,
}

impl ArbitrationEngine {
    pub fn new(
        policy: Policy,
        location: Arc<dyn LocationProvider>,
        motion: Arc<dyn MotionActivityProvider>,
        accessory: Arc<dyn AccessoryConnectionProvider>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(
            settle_secs = policy.motion.stationary_settle.as_secs(),
            grace_secs = policy.accessory.disconnect_grace.as_secs(),
            "Arbitration engine initialized"
        );

        Self {
            policy,
            lifecycle: Arc::new(SessionLifecycle::new()),
            location,
            motion,
            accessory,
            dispatcher,
            active: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            events_rx: tokio::sync::Mutex::new(Some(events_rx)),
        }
    }

    /// Get current policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Take the engine's event stream. Returns None after the first call.
    pub async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Create a session, activate it, and start its signal sources.
    pub fn start_session(&self, plan: SessionPlan) -> EngineResult<SessionId> {
        let now = satchel_util::now();
        let now_mono = MonotonicInstant::now();

        let session_id = self.lifecycle.create(plan.clone());
        self.lifecycle.activate(session_id, now, now_mono)?;
        self.spawn_sources(session_id, 0, &plan, plan.planned_duration);

        info!(
            session_id = %session_id,
            planned_secs = plan.planned_duration.as_secs(),
            watched_peripherals = plan.peripherals.len(),
            has_region = plan.region.is_some(),
            "Session started"
        );

        let _ = self.events_tx.send(SessionEvent::SessionStarted {
            session_id,
            planned_duration: plan.planned_duration,
        });

        Ok(session_id)
    }

    /// Pause a session: no signal may complete it until it resumes.
    pub fn pause_session(&self, session_id: SessionId) -> EngineResult<()> {
        // Registry first: a signal racing the teardown already sees Paused
        self.lifecycle.pause(session_id, MonotonicInstant::now())?;
        teardown_sources(&self.active, &self.location, session_id);

        info!(session_id = %session_id, "Session paused");
        let _ = self
            .events_tx
            .send(SessionEvent::SessionPaused { session_id });
        Ok(())
    }

    /// Resume a paused session with fresh sources under the new epoch.
    pub fn resume_session(&self, session_id: SessionId) -> EngineResult<()> {
        let now_mono = MonotonicInstant::now();
        self.lifecycle.resume(session_id, now_mono)?;

        let epoch = self.lifecycle.epoch(session_id)?;
        let plan = self.lifecycle.plan(session_id)?;
        let remaining = self.lifecycle.time_remaining(session_id, now_mono)?;
        self.spawn_sources(session_id, epoch, &plan, remaining);

        // A stop or fail can land between the registry flip above and
        // the source insert inside spawn_sources; its teardown finds
        // no entry yet, so re-check here rather than leak the fresh
        // sources under a session that is no longer Active.
        if self.lifecycle.state(session_id)? != SessionState::Active {
            teardown_sources(&self.active, &self.location, session_id);
            return Ok(());
        }

        info!(
            session_id = %session_id,
            epoch,
            remaining_secs = remaining.as_secs(),
            "Session resumed"
        );
        let _ = self
            .events_tx
            .send(SessionEvent::SessionResumed { session_id });
        Ok(())
    }

    /// Complete a session at the user's request. Allowed from Active or
    /// Paused; reports `AlreadyCompleted` when a signal beat the user
    /// to it.
    pub async fn stop_manual(&self, session_id: SessionId) -> EngineResult<CompletionOutcome> {
        let outcome = self.lifecycle.attempt_complete(
            session_id,
            EndSignal::Manual,
            None,
            satchel_util::now(),
            MonotonicInstant::now(),
        )?;

        if let CompletionOutcome::Completed { active_duration } = &outcome {
            teardown_sources(&self.active, &self.location, session_id);
            info!(
                session_id = %session_id,
                active_secs = active_duration.as_secs(),
                "Session completed manually"
            );
            if let Err(err) = self
                .dispatcher
                .notify_session_ended(session_id, EndSignal::Manual)
                .await
            {
                warn!(session_id = %session_id, error = %err, "Completion notification failed");
            }
            let _ = self.events_tx.send(SessionEvent::SessionCompleted {
                session_id,
                end_signal: EndSignal::Manual,
                active_duration: *active_duration,
            });
        }

        Ok(outcome)
    }

    /// Mark a session failed and stop its sources. No end signal is
    /// recorded and no notification is dispatched.
    pub fn fail_session(
        &self,
        session_id: SessionId,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        let reason = reason.into();
        self.lifecycle.fail(
            session_id,
            reason.clone(),
            satchel_util::now(),
            MonotonicInstant::now(),
        )?;
        teardown_sources(&self.active, &self.location, session_id);

        info!(session_id = %session_id, reason = %reason, "Session failed");
        let _ = self
            .events_tx
            .send(SessionEvent::SessionFailed { session_id, reason });
        Ok(())
    }

    pub fn session_state(&self, session_id: SessionId) -> EngineResult<SessionState> {
        self.lifecycle.state(session_id)
    }

    pub fn end_signal(&self, session_id: SessionId) -> EngineResult<Option<EndSignal>> {
        self.lifecycle.end_signal(session_id)
    }

    pub fn snapshot(&self, session_id: SessionId) -> EngineResult<SessionSnapshot> {
        self.lifecycle.snapshot(session_id, MonotonicInstant::now())
    }

    /// Snapshots of every known session, terminal ones included.
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.lifecycle.snapshots(MonotonicInstant::now())
    }

    /// Whether source tasks are currently running for this session.
    pub fn has_running_sources(&self, session_id: SessionId) -> bool {
        self.active.lock().unwrap().contains_key(&session_id)
    }

    /// Abort every session's sources. States are left as they are;
    /// callers snapshot afterwards.
    pub fn shutdown(&self) {
        let ids: Vec<SessionId> = self.active.lock().unwrap().keys().copied().collect();
        for session_id in ids {
            teardown_sources(&self.active, &self.location, session_id);
        }
    }

    fn spawn_sources(
        &self,
        session_id: SessionId,
        epoch: u64,
        plan: &SessionPlan,
        remaining: Duration,
    ) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let ctx = SourceContext {
            session_id,
            epoch,
            signals: signals_tx,
            events: self.events_tx.clone(),
        };
        let established_region = Arc::new(Mutex::new(RegionSlot::Pending));

        let mut tasks = vec![sources::spawn_timer(ctx.clone(), remaining)];
        if let Some(spec) = plan.region {
            tasks.push(sources::spawn_geofence(
                ctx.clone(),
                self.location.clone(),
                spec,
                established_region.clone(),
            ));
        }
        tasks.push(sources::spawn_motion(
            ctx.clone(),
            self.motion.clone(),
            self.policy.motion.clone(),
        ));
        if !plan.peripherals.is_empty() {
            tasks.push(sources::spawn_accessory(
                ctx,
                self.accessory.clone(),
                self.policy.accessory.clone(),
                plan.peripherals.clone(),
            ));
        }

        // The entry must be registered before the arbiter starts so a
        // winning signal always finds sources to tear down
        self.active.lock().unwrap().insert(
            session_id,
            SourceEntry {
                tasks,
                established_region,
            },
        );

        spawn_arbiter(
            session_id,
            signals_rx,
            self.lifecycle.clone(),
            self.dispatcher.clone(),
            self.active.clone(),
            self.location.clone(),
            self.events_tx.clone(),
        );
    }
}

/// Consume qualified signals for one session until a winner completes
/// it or every source sender is gone.
///
/// The winner tears down the remaining sources, dispatches the
/// notification, and emits the completion event; losing and stale
/// attempts are dropped. The arbiter is deliberately not tracked in
/// the active set: it exits on its own when the source senders drop,
/// and aborting it mid-win could lose the notification.
fn spawn_arbiter(
    session_id: SessionId,
    mut signals: mpsc::UnboundedReceiver<QualifiedSignal>,
    lifecycle: Arc<SessionLifecycle>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    active: Arc<Mutex<HashMap<SessionId, SourceEntry>>>,
    location: Arc<dyn LocationProvider>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            let end_signal = EndSignal::from(signal.kind);
            let outcome = lifecycle.attempt_complete(
                session_id,
                end_signal,
                Some(signal.epoch),
                satchel_util::now(),
                MonotonicInstant::now(),
            );

            match outcome {
                Ok(CompletionOutcome::Completed { active_duration }) => {
                    teardown_sources(&active, &location, session_id);
                    info!(
                        session_id = %session_id,
                        end_signal = %end_signal,
                        active_secs = active_duration.as_secs(),
                        "Session completed"
                    );
                    if let Err(err) = dispatcher.notify_session_ended(session_id, end_signal).await
                    {
                        warn!(
                            session_id = %session_id,
                            error = %err,
                            "Completion notification failed"
                        );
                    }
                    let _ = events.send(SessionEvent::SessionCompleted {
                        session_id,
                        end_signal,
                        active_duration,
                    });
                    break;
                }
                Ok(outcome) => {
                    debug!(
                        session_id = %session_id,
                        kind = %signal.kind,
                        outcome = ?outcome,
                        "Signal lost arbitration"
                    );
                }
                Err(err) => {
                    warn!(
                        session_id = %session_id,
                        kind = %signal.kind,
                        error = %err,
                        "Signal rejected"
                    );
                }
            }
        }
    })
}

/// Remove and abort a session's source tasks, clearing any geofence
/// the session established. Idempotent: later calls find nothing.
fn teardown_sources(
    active: &Mutex<HashMap<SessionId, SourceEntry>>,
    location: &Arc<dyn LocationProvider>,
    session_id: SessionId,
) -> bool {
    let entry = active.lock().unwrap().remove(&session_id);
    match entry {
        Some(entry) => {
            for task in &entry.tasks {
                task.abort();
            }
            let region = {
                let mut slot = entry.established_region.lock().unwrap();
                match std::mem::replace(&mut *slot, RegionSlot::Cleared) {
                    RegionSlot::Established(region) => Some(region),
                    _ => None,
                }
            };
            if let Some(region) = region {
                let location = location.clone();
                tokio::spawn(async move {
                    if let Err(err) = location.clear_geofence(&region).await {
                        warn!(region = %region, error = %err, "Failed to clear geofence");
                    }
                });
            }
            debug!(session_id = %session_id, "Sources stopped");
            true
        }
        None => false,
    }
}

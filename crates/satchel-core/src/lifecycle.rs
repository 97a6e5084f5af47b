//! Session registry and transition authority
//!
//! Each session record sits behind its own lock, so a completion
//! attempt is an atomic test-and-set on that record: exactly one
//! signal can ever move a session to Completed, no matter how many
//! arrive concurrently. Attempts on different sessions never contend;
//! the registry map is locked only to look up or insert a record.

use crate::{
    CompletionOutcome, EngineError, EngineResult, Session, SessionPlan, SessionSnapshot,
    SessionState,
};
use chrono::{DateTime, Local};
use satchel_util::{EndSignal, MonotonicInstant, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

type SessionRecord = Arc<Mutex<Session>>;

/// Registry of all sessions, live and terminal
pub struct SessionLifecycle {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn record(&self, id: SessionId) -> EngineResult<SessionRecord> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(&id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(id))
    }

    /// Register a new session in NotStarted.
    pub fn create(&self, plan: SessionPlan) -> SessionId {
        let id = SessionId::new();
        let record = Arc::new(Mutex::new(Session::new(id, plan)));
        self.sessions.write().unwrap().insert(id, record);
        id
    }

    pub fn activate(
        &self,
        id: SessionId,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<()> {
        self.record(id)?.lock().unwrap().activate(now, now_mono)
    }

    pub fn pause(&self, id: SessionId, now_mono: MonotonicInstant) -> EngineResult<()> {
        self.record(id)?.lock().unwrap().pause(now_mono)
    }

    pub fn resume(&self, id: SessionId, now_mono: MonotonicInstant) -> EngineResult<()> {
        self.record(id)?.lock().unwrap().resume(now_mono)
    }

    /// Atomically attempt to complete a session. See
    /// [`Session::attempt_complete`] for the admission rules.
    pub fn attempt_complete(
        &self,
        id: SessionId,
        signal: EndSignal,
        source_epoch: Option<u64>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<CompletionOutcome> {
        self.record(id)?
            .lock()
            .unwrap()
            .attempt_complete(signal, source_epoch, now, now_mono)
    }

    pub fn fail(
        &self,
        id: SessionId,
        reason: impl Into<String>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<()> {
        self.record(id)?.lock().unwrap().fail(reason, now, now_mono)
    }

    pub fn state(&self, id: SessionId) -> EngineResult<SessionState> {
        Ok(self.record(id)?.lock().unwrap().state())
    }

    pub fn end_signal(&self, id: SessionId) -> EngineResult<Option<EndSignal>> {
        Ok(self.record(id)?.lock().unwrap().end_signal())
    }

    pub fn epoch(&self, id: SessionId) -> EngineResult<u64> {
        Ok(self.record(id)?.lock().unwrap().epoch())
    }

    pub fn plan(&self, id: SessionId) -> EngineResult<SessionPlan> {
        Ok(self.record(id)?.lock().unwrap().plan.clone())
    }

    pub fn time_remaining(
        &self,
        id: SessionId,
        now_mono: MonotonicInstant,
    ) -> EngineResult<Duration> {
        Ok(self.record(id)?.lock().unwrap().time_remaining(now_mono))
    }

    pub fn snapshot(
        &self,
        id: SessionId,
        now_mono: MonotonicInstant,
    ) -> EngineResult<SessionSnapshot> {
        Ok(self.record(id)?.lock().unwrap().snapshot(now_mono))
    }

    /// Snapshots of every known session, terminal ones included.
    pub fn snapshots(&self, now_mono: MonotonicInstant) -> Vec<SessionSnapshot> {
        let records: Vec<SessionRecord> =
            self.sessions.read().unwrap().values().cloned().collect();
        records
            .iter()
            .map(|r| r.lock().unwrap().snapshot(now_mono))
            .collect()
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_plan() -> SessionPlan {
        SessionPlan {
            planned_duration: Duration::from_secs(600),
            region: None,
            peripherals: Vec::new(),
        }
    }

    #[test]
    fn test_create_registers_not_started() {
        let lifecycle = SessionLifecycle::new();
        let id = lifecycle.create(make_test_plan());
        assert_eq!(lifecycle.state(id).unwrap(), SessionState::NotStarted);
    }

    #[test]
    fn test_unknown_session_is_an_error() {
        let lifecycle = SessionLifecycle::new();
        let err = lifecycle.state(SessionId::new()).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let t0 = MonotonicInstant::now();
        let lifecycle = SessionLifecycle::new();
        let id = lifecycle.create(make_test_plan());
        lifecycle.activate(id, satchel_util::now(), t0).unwrap();

        lifecycle.pause(id, t0 + Duration::from_secs(60)).unwrap();
        assert_eq!(lifecycle.state(id).unwrap(), SessionState::Paused);
        assert_eq!(lifecycle.epoch(id).unwrap(), 1);

        lifecycle.resume(id, t0 + Duration::from_secs(120)).unwrap();
        assert_eq!(lifecycle.state(id).unwrap(), SessionState::Active);
        assert_eq!(
            lifecycle
                .time_remaining(id, t0 + Duration::from_secs(120))
                .unwrap(),
            Duration::from_secs(540)
        );
    }

    #[test]
    fn test_first_completion_wins() {
        let t0 = MonotonicInstant::now();
        let lifecycle = SessionLifecycle::new();
        let id = lifecycle.create(make_test_plan());
        lifecycle.activate(id, satchel_util::now(), t0).unwrap();

        let first = lifecycle
            .attempt_complete(
                id,
                EndSignal::Geofence,
                Some(0),
                satchel_util::now(),
                t0 + Duration::from_secs(300),
            )
            .unwrap();
        assert!(matches!(first, CompletionOutcome::Completed { .. }));

        let second = lifecycle
            .attempt_complete(
                id,
                EndSignal::Timer,
                Some(0),
                satchel_util::now(),
                t0 + Duration::from_secs(300),
            )
            .unwrap();
        assert_eq!(second, CompletionOutcome::AlreadyCompleted);
        assert_eq!(lifecycle.end_signal(id).unwrap(), Some(EndSignal::Geofence));
    }

    #[test]
    fn test_snapshots_cover_terminal_sessions() {
        let t0 = MonotonicInstant::now();
        let lifecycle = SessionLifecycle::new();

        let done = lifecycle.create(make_test_plan());
        lifecycle.activate(done, satchel_util::now(), t0).unwrap();
        lifecycle
            .attempt_complete(
                done,
                EndSignal::Manual,
                None,
                satchel_util::now(),
                t0 + Duration::from_secs(10),
            )
            .unwrap();

        let failed = lifecycle.create(make_test_plan());
        lifecycle.activate(failed, satchel_util::now(), t0).unwrap();
        lifecycle
            .fail(
                failed,
                "app terminated",
                satchel_util::now(),
                t0 + Duration::from_secs(20),
            )
            .unwrap();

        let snapshots = lifecycle.snapshots(t0 + Duration::from_secs(30));
        assert_eq!(snapshots.len(), 2);
        let states: Vec<SessionState> = snapshots.iter().map(|s| s.state).collect();
        assert!(states.contains(&SessionState::Completed));
        assert!(states.contains(&SessionState::Failed));
    }
}

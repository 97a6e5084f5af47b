//! Session entity and state machine

use crate::{EngineError, EngineResult};
use chrono::{DateTime, Local};
use satchel_util::{EndSignal, MonotonicInstant, PeripheralId, SessionId};
use satchel_providers::RegionSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Active,
    Paused,
    Completed,
    Failed,
}

impl SessionState {
    /// Completed and Failed are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// Everything needed to start a session: how long it should run and
/// which places and accessories to watch for early-end signals.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    /// Expected session length; the timer signal fires when the
    /// accumulated active time reaches this.
    pub planned_duration: Duration,

    /// Destination region to watch for exit crossings, if any.
    pub region: Option<RegionSpec>,

    /// Accessories whose sustained disconnect ends the session.
    pub peripherals: Vec<PeripheralId>,
}

/// Result of a completion attempt.
///
/// Only `Completed` means this caller won and owns the follow-up work
/// (notification, source teardown). Everything else is a losing or
/// late attempt and must be dropped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This attempt completed the session.
    Completed { active_duration: Duration },
    /// Another signal already completed the session.
    AlreadyCompleted,
    /// The session is paused, or the signal was qualified before a
    /// pause and is now stale.
    NotActive,
}

/// A single reminder session and its end-signal bookkeeping.
///
/// All mutation goes through the transition methods so the core
/// invariant holds: `end_signal` is set exactly once, and only when
/// the session reaches `Completed`.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub plan: SessionPlan,
    state: SessionState,
    end_signal: Option<EndSignal>,
    failure_reason: Option<String>,
    /// Bumped on every pause. Signals qualified under an older epoch
    /// are rejected even if they arrive after a resume.
    epoch: u64,
    created_at: DateTime<Local>,
    started_at: Option<DateTime<Local>>,
    ended_at: Option<DateTime<Local>>,
    /// Start of the current active span, None while not running.
    activated_at_mono: Option<MonotonicInstant>,
    /// Active time accumulated over previous spans (excludes pauses).
    accumulated_active: Duration,
}

impl Session {
    pub fn new(id: SessionId, plan: SessionPlan) -> Self {
        Self {
            id,
            plan,
            state: SessionState::NotStarted,
            end_signal: None,
            failure_reason: None,
            epoch: 0,
            created_at: satchel_util::now(),
            started_at: None,
            ended_at: None,
            activated_at_mono: None,
            accumulated_active: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn end_signal(&self) -> Option<EndSignal> {
        self.end_signal
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Local>> {
        self.ended_at
    }

    /// Begin the session. Valid only from NotStarted.
    pub fn activate(
        &mut self,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<()> {
        if self.state != SessionState::NotStarted {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                attempted: SessionState::Active,
            });
        }
        self.state = SessionState::Active;
        self.started_at = Some(now);
        self.activated_at_mono = Some(now_mono);
        Ok(())
    }

    /// Suspend the session. Settles the current active span into the
    /// accumulator and bumps the epoch so in-flight signals go stale.
    pub fn pause(&mut self, now_mono: MonotonicInstant) -> EngineResult<()> {
        if self.state != SessionState::Active {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                attempted: SessionState::Paused,
            });
        }
        self.settle_active_span(now_mono);
        self.epoch += 1;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Resume a paused session, opening a new active span.
    pub fn resume(&mut self, now_mono: MonotonicInstant) -> EngineResult<()> {
        if self.state != SessionState::Paused {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                attempted: SessionState::Active,
            });
        }
        self.state = SessionState::Active;
        self.activated_at_mono = Some(now_mono);
        Ok(())
    }

    /// Try to complete the session with the given end signal.
    ///
    /// Automatic signals carry the epoch they were qualified under and
    /// are only honored while Active and current. Manual completion
    /// passes `None` and is also allowed from Paused. Attempts against
    /// a session that never started or already failed are transition
    /// errors; losing attempts after a winner are not.
    pub fn attempt_complete(
        &mut self,
        signal: EndSignal,
        source_epoch: Option<u64>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<CompletionOutcome> {
        match self.state {
            SessionState::Completed => return Ok(CompletionOutcome::AlreadyCompleted),
            SessionState::NotStarted | SessionState::Failed => {
                return Err(EngineError::InvalidTransition {
                    from: self.state,
                    attempted: SessionState::Completed,
                });
            }
            SessionState::Paused if signal != EndSignal::Manual => {
                return Ok(CompletionOutcome::NotActive);
            }
            SessionState::Active | SessionState::Paused => {}
        }

        if let Some(epoch) = source_epoch
            && epoch != self.epoch
        {
            return Ok(CompletionOutcome::NotActive);
        }

        self.settle_active_span(now_mono);
        self.state = SessionState::Completed;
        self.end_signal = Some(signal);
        self.ended_at = Some(now);
        Ok(CompletionOutcome::Completed {
            active_duration: self.accumulated_active,
        })
    }

    /// Mark the session failed. Valid from any non-terminal state; the
    /// end signal stays unset.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> EngineResult<()> {
        if self.state.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                attempted: SessionState::Failed,
            });
        }
        self.settle_active_span(now_mono);
        self.state = SessionState::Failed;
        self.failure_reason = Some(reason.into());
        self.ended_at = Some(now);
        Ok(())
    }

    /// Total active time so far, excluding paused spans.
    pub fn active_duration(&self, now_mono: MonotonicInstant) -> Duration {
        match self.activated_at_mono {
            Some(span_start) => self.accumulated_active + now_mono.duration_since(span_start),
            None => self.accumulated_active,
        }
    }

    /// Active time left until the planned duration is reached.
    pub fn time_remaining(&self, now_mono: MonotonicInstant) -> Duration {
        self.plan
            .planned_duration
            .saturating_sub(self.active_duration(now_mono))
    }

    pub fn snapshot(&self, now_mono: MonotonicInstant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            end_signal: self.end_signal,
            failure_reason: self.failure_reason.clone(),
            planned_duration: self.plan.planned_duration,
            active_duration: self.active_duration(now_mono),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn settle_active_span(&mut self, now_mono: MonotonicInstant) {
        if let Some(span_start) = self.activated_at_mono.take() {
            self.accumulated_active += now_mono.duration_since(span_start);
        }
    }
}

/// Serializable view of a session for status output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: SessionState,
    pub end_signal: Option<EndSignal>,
    pub failure_reason: Option<String>,
    pub planned_duration: Duration,
    pub active_duration: Duration,
    pub created_at: DateTime<Local>,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
}

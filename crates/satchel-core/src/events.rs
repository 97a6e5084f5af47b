//! Events emitted by the arbitration engine

use satchel_util::{EndSignal, SessionId, SignalKind};
use std::time::Duration;

/// A qualified end signal handed from a source task to its session's
/// arbiter. Carries the epoch it was qualified under so arbitration
/// can reject signals that straddled a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedSignal {
    pub kind: SignalKind,
    pub epoch: u64,
}

/// Events emitted by the arbitration engine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session activated and its signal sources started
    SessionStarted {
        session_id: SessionId,
        planned_duration: Duration,
    },

    /// Session paused; sources stopped, the timer holds its remainder
    SessionPaused {
        session_id: SessionId,
    },

    /// Session resumed with fresh sources
    SessionResumed {
        session_id: SessionId,
    },

    /// A source's condition held through qualification and entered
    /// arbitration. At most one of these per session wins.
    SignalQualified {
        session_id: SessionId,
        kind: SignalKind,
    },

    /// Session completed; `end_signal` names the winning signal
    SessionCompleted {
        session_id: SessionId,
        end_signal: EndSignal,
        active_duration: Duration,
    },

    /// Session failed; no end signal is recorded
    SessionFailed {
        session_id: SessionId,
        reason: String,
    },

    /// A source could not start and will contribute no signal for the
    /// rest of the session. The session itself continues.
    SourceDegraded {
        session_id: SessionId,
        kind: SignalKind,
        reason: String,
    },
}

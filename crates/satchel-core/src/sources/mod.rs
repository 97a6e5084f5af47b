//! Signal source tasks
//!
//! One task per (session, signal kind). Each task owns its
//! qualification state privately and reports qualified signals to the
//! session's arbiter; it never touches session state itself. Sources
//! are aborted wholesale on pause and respawned on resume, so nothing
//! here survives a pause.

mod accessory;
mod geofence;
mod motion;
mod timer;

pub(crate) use accessory::spawn_accessory;
pub(crate) use geofence::{RegionSlot, spawn_geofence};
pub(crate) use motion::spawn_motion;
pub(crate) use timer::spawn_timer;

use crate::{QualifiedSignal, SessionEvent};
use satchel_util::{MonotonicInstant, SessionId, SignalKind};
use tokio::sync::mpsc;

/// Handles a source task uses to report back for one session
#[derive(Clone)]
pub(crate) struct SourceContext {
    pub session_id: SessionId,
    /// Epoch the sources were spawned under, stamped onto every
    /// qualified signal so arbitration can reject stale ones.
    pub epoch: u64,
    pub signals: mpsc::UnboundedSender<QualifiedSignal>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
}

impl SourceContext {
    /// Hand a qualified signal to the arbiter and surface it on the
    /// event stream.
    pub fn qualify(&self, kind: SignalKind) {
        let _ = self.events.send(SessionEvent::SignalQualified {
            session_id: self.session_id,
            kind,
        });
        let _ = self.signals.send(QualifiedSignal {
            kind,
            epoch: self.epoch,
        });
    }

    /// Report that this source cannot run for the rest of the session.
    pub fn degraded(&self, kind: SignalKind, reason: String) {
        let _ = self.events.send(SessionEvent::SourceDegraded {
            session_id: self.session_id,
            kind,
            reason,
        });
    }
}

/// Sleep until an optional deadline; pends forever when there is none.
pub(crate) async fn wait_until(deadline: Option<MonotonicInstant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into_instant()).await,
        None => std::future::pending().await,
    }
}

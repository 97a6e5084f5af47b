//! Planned-duration timer source

use super::SourceContext;
use satchel_util::SignalKind;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fires once after `remaining` of active time.
///
/// The engine computes the remainder from the session's accumulated
/// active time at spawn, so a timer respawned after a pause picks up
/// where it left off rather than restarting the full duration.
pub(crate) fn spawn_timer(ctx: SourceContext, remaining: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(remaining).await;
        debug!(session_id = %ctx.session_id, "planned duration reached");
        ctx.qualify(SignalKind::Timer);
    })
}

//! Motion activity source

use super::{SourceContext, wait_until};
use crate::Debouncer;
use satchel_config::MotionPolicy;
use satchel_providers::MotionActivityProvider;
use satchel_util::{MonotonicInstant, SignalKind};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Watches the activity stream for either end-of-drive or settled
/// stillness.
///
/// An automotive-to-not-automotive transition qualifies immediately:
/// the vehicle arrived. Stillness must instead hold through the
/// configured settle window, with any contradicting sample inside the
/// window cancelling or restarting it. Samples below the confidence
/// floor are dropped before they can touch either rule.
///
/// The select is biased toward the sample branch so a contradicting
/// sample already queued beats a settle deadline expiring in the same
/// instant.
pub(crate) fn spawn_motion(
    ctx: SourceContext,
    provider: Arc<dyn MotionActivityProvider>,
    policy: MotionPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut samples = provider.subscribe();
        let mut stillness = Debouncer::new(policy.stationary_settle);
        let mut automotive = false;

        loop {
            tokio::select! {
                biased;

                sample = samples.recv() => {
                    let sample = match sample {
                        Some(s) => s,
                        None => break,
                    };
                    if sample.confidence < policy.min_confidence {
                        continue;
                    }
                    if automotive && !sample.automotive {
                        debug!(session_id = %ctx.session_id, "drive ended");
                        ctx.qualify(SignalKind::Motion);
                        break;
                    }
                    automotive = sample.automotive;
                    stillness.observe(sample.stationary, MonotonicInstant::now());
                }

                _ = wait_until(stillness.next_deadline()) => {
                    if stillness.due(MonotonicInstant::now()) == Some(true) {
                        debug!(
                            session_id = %ctx.session_id,
                            settle_secs = policy.stationary_settle.as_secs(),
                            "stillness settled"
                        );
                        ctx.qualify(SignalKind::Motion);
                        break;
                    }
                }
            }
        }
    })
}

//! Geofence exit source

use super::SourceContext;
use satchel_providers::{Crossing, LocationProvider, ProviderError, RegionSpec};
use satchel_util::{RegionId, SignalKind};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handoff of the established region id between the geofence task and
/// engine teardown.
///
/// Teardown marks the slot `Cleared`; an establishment that lands
/// after that mark clears the region itself instead of publishing it,
/// so a region registered with the provider is never stranded.
#[derive(Debug)]
pub(crate) enum RegionSlot {
    Pending,
    Established(RegionId),
    Cleared,
}

/// Watches for an exit crossing of the session's destination region.
///
/// Subscribes before establishing so a crossing reported during
/// establishment is queued rather than lost, and filters observations
/// to the established region id so reports for stale registrations
/// are ignored. Establishment runs in its own task: aborting this
/// source while the provider call is in flight cannot strand a region
/// the provider already registered. If establishment fails the source
/// degrades and the session continues on its other signals.
pub(crate) fn spawn_geofence(
    ctx: SourceContext,
    provider: Arc<dyn LocationProvider>,
    spec: RegionSpec,
    established: Arc<Mutex<RegionSlot>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut observations = provider.subscribe();

        let establish = {
            let provider = provider.clone();
            let slot = established.clone();
            tokio::spawn(async move {
                let region = provider.establish_geofence(spec).await?;
                let torn_down = {
                    let mut slot = slot.lock().unwrap();
                    match *slot {
                        RegionSlot::Cleared => true,
                        _ => {
                            *slot = RegionSlot::Established(region);
                            false
                        }
                    }
                };
                if torn_down {
                    // Teardown already passed; nobody else knows this
                    // region exists
                    let _ = provider.clear_geofence(&region).await;
                    return Ok(None);
                }
                Ok::<Option<RegionId>, ProviderError>(Some(region))
            })
        };

        let region = match establish.await {
            Ok(Ok(Some(region))) => region,
            Ok(Ok(None)) => return,
            Ok(Err(err)) => {
                warn!(
                    session_id = %ctx.session_id,
                    error = %err,
                    "geofence establishment failed, source degraded"
                );
                ctx.degraded(SignalKind::Geofence, err.to_string());
                return;
            }
            Err(_) => return,
        };
        debug!(session_id = %ctx.session_id, region = %region, "geofence established");

        while let Some(obs) = observations.recv().await {
            if obs.region != region {
                debug!(
                    session_id = %ctx.session_id,
                    region = %obs.region,
                    "ignoring crossing for stale region"
                );
                continue;
            }
            if obs.crossing == Crossing::Exited {
                debug!(session_id = %ctx.session_id, "exit crossing observed");
                ctx.qualify(SignalKind::Geofence);
                return;
            }
        }
    })
}

//! Accessory disconnect source

use super::{SourceContext, wait_until};
use crate::GraceBank;
use satchel_config::AccessoryPolicy;
use satchel_providers::{AccessoryConnectionProvider, AccessoryEvent};
use satchel_util::{MonotonicInstant, PeripheralId, SignalKind};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Watches the session's peripherals for a sustained disconnect.
///
/// Only peripherals that have been seen connected count; a disconnect
/// report for one that never connected is ignored. The connected set
/// only grows, so a peripheral that drops and reconnects mid-session
/// can still qualify on a later disconnect. Each peripheral gets an
/// independent grace window, disarmed by its own reconnect.
///
/// Subscribes before taking the connected snapshot so observations
/// racing the snapshot are queued rather than lost. If the snapshot
/// fails the source degrades and the session continues on its other
/// signals.
pub(crate) fn spawn_accessory(
    ctx: SourceContext,
    provider: Arc<dyn AccessoryConnectionProvider>,
    policy: AccessoryPolicy,
    watched: Vec<PeripheralId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut observations = provider.subscribe();

        let mut connected: HashSet<PeripheralId> = match provider.connected_peripherals().await {
            Ok(peripherals) => peripherals
                .into_iter()
                .filter(|p| watched.contains(p))
                .collect(),
            Err(err) => {
                warn!(
                    session_id = %ctx.session_id,
                    error = %err,
                    "accessory snapshot failed, source degraded"
                );
                ctx.degraded(SignalKind::Accessory, err.to_string());
                return;
            }
        };

        let mut grace: GraceBank<PeripheralId> = GraceBank::new(policy.disconnect_grace);

        loop {
            tokio::select! {
                biased;

                obs = observations.recv() => {
                    let obs = match obs {
                        Some(o) => o,
                        None => break,
                    };
                    if !watched.contains(&obs.peripheral) {
                        continue;
                    }
                    match obs.event {
                        AccessoryEvent::Connected => {
                            connected.insert(obs.peripheral.clone());
                            if grace.disarm(&obs.peripheral) {
                                debug!(
                                    session_id = %ctx.session_id,
                                    peripheral = %obs.peripheral,
                                    "reconnected within grace"
                                );
                            }
                        }
                        AccessoryEvent::Disconnected => {
                            if connected.contains(&obs.peripheral) {
                                grace.arm(obs.peripheral.clone(), MonotonicInstant::now());
                                debug!(
                                    session_id = %ctx.session_id,
                                    peripheral = %obs.peripheral,
                                    grace_secs = policy.disconnect_grace.as_secs(),
                                    "disconnect observed, grace armed"
                                );
                            }
                        }
                    }
                }

                _ = wait_until(grace.next_deadline()) => {
                    let due = grace.take_due(MonotonicInstant::now());
                    if let Some(peripheral) = due.first() {
                        debug!(
                            session_id = %ctx.session_id,
                            peripheral = %peripheral,
                            "disconnect held through grace"
                        );
                        ctx.qualify(SignalKind::Accessory);
                        break;
                    }
                }
            }
        }
    })
}

//! satcheld - scenario replay harness for the arbitration engine
//!
//! Wires together the pieces a host app would provide:
//! - Configuration loading
//! - Scripted providers driven by a scenario timeline
//! - The arbitration engine and its event stream
//!
//! Replays the timeline against a live session, streams session events
//! to the log, and prints the final session snapshot as JSON.

mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use satchel_config::{load_config, Policy};
use satchel_core::{ArbitrationEngine, CompletionOutcome, SessionEvent};
use satchel_providers::{
    ActivitySample, MockAccessoryProvider, MockLocationProvider, MockMotionProvider,
    RecordingDispatcher,
};
use satchel_util::{MonotonicInstant, SessionId};
use scenario::{Action, Scenario, Step};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// satcheld - end-signal arbitration replay harness
#[derive(Parser, Debug)]
#[command(name = "satcheld")]
#[command(about = "Replays end-signal scenarios against the arbitration engine", long_about = None)]
struct Args {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario timeline to replay (or set SATCHEL_SCENARIO env var)
    #[arg(short, long, env = "SATCHEL_SCENARIO")]
    scenario: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main harness state
struct Service {
    policy: Policy,
    scenario: Scenario,
    engine: Arc<ArbitrationEngine>,
    location: Arc<MockLocationProvider>,
    motion: Arc<MockMotionProvider>,
    accessory: Arc<MockAccessoryProvider>,
    dispatcher: Arc<RecordingDispatcher>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let policy = match &args.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => Policy::default(),
        };

        info!(
            config_path = ?args.config,
            settle_secs = policy.motion.stationary_settle.as_secs(),
            grace_secs = policy.accessory.disconnect_grace.as_secs(),
            "Configuration loaded"
        );

        // Load scenario
        let scenario = Scenario::load(&args.scenario)?;

        info!(
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "Scenario loaded"
        );

        // Scripted providers: the scenario connects every watched
        // peripheral up front, disconnects come from the timeline
        let location = Arc::new(MockLocationProvider::new());
        let motion = Arc::new(MockMotionProvider::new());
        let accessory = Arc::new(MockAccessoryProvider::with_connected(
            scenario
                .session
                .peripherals
                .iter()
                .map(|p| p.as_str().into()),
        ));
        let dispatcher = Arc::new(RecordingDispatcher::new());

        let engine = Arc::new(ArbitrationEngine::new(
            policy.clone(),
            location.clone(),
            motion.clone(),
            accessory.clone(),
            dispatcher.clone(),
        ));

        Ok(Self {
            policy,
            scenario,
            engine,
            location,
            motion,
            accessory,
            dispatcher,
        })
    }

    async fn run(self) -> Result<()> {
        let mut events = self
            .engine
            .take_events()
            .await
            .context("Event stream already taken")?;

        // Start the scenario's session
        let plan = self.scenario.plan(&self.policy);
        let session_id = self.engine.start_session(plan)?;

        // Spawn the timeline replay
        let replay_handle = tokio::spawn(replay(
            self.scenario.steps,
            session_id,
            self.engine.clone(),
            self.location.clone(),
            self.motion.clone(),
            self.accessory.clone(),
        ));

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        info!("Harness running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }

                Some(event) = events.recv() => {
                    if Self::handle_event(event) {
                        break;
                    }
                }
            }
        }

        // Graceful shutdown
        replay_handle.abort();
        self.engine.shutdown();

        info!(
            notifications = self.dispatcher.notify_count(),
            "Replay finished"
        );

        let snapshot = self.engine.snapshot(session_id)?;
        let json =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
        println!("{json}");

        Ok(())
    }

    /// Log one engine event; returns true once the session is terminal.
    fn handle_event(event: SessionEvent) -> bool {
        match event {
            SessionEvent::SessionStarted {
                session_id,
                planned_duration,
            } => {
                info!(
                    session_id = %session_id,
                    planned_secs = planned_duration.as_secs(),
                    "Event: session started"
                );
            }
            SessionEvent::SessionPaused { session_id } => {
                info!(session_id = %session_id, "Event: session paused");
            }
            SessionEvent::SessionResumed { session_id } => {
                info!(session_id = %session_id, "Event: session resumed");
            }
            SessionEvent::SignalQualified { session_id, kind } => {
                info!(session_id = %session_id, kind = %kind, "Event: signal qualified");
            }
            SessionEvent::SessionCompleted {
                session_id,
                end_signal,
                active_duration,
            } => {
                info!(
                    session_id = %session_id,
                    end_signal = %end_signal,
                    active_secs = active_duration.as_secs(),
                    "Event: session completed"
                );
                return true;
            }
            SessionEvent::SessionFailed { session_id, reason } => {
                info!(session_id = %session_id, reason = %reason, "Event: session failed");
                return true;
            }
            SessionEvent::SourceDegraded {
                session_id,
                kind,
                reason,
            } => {
                warn!(
                    session_id = %session_id,
                    kind = %kind,
                    reason = %reason,
                    "Event: source degraded"
                );
            }
        }
        false
    }
}

/// Replay timeline steps at their offsets from session start.
async fn replay(
    steps: Vec<Step>,
    session_id: SessionId,
    engine: Arc<ArbitrationEngine>,
    location: Arc<MockLocationProvider>,
    motion: Arc<MockMotionProvider>,
    accessory: Arc<MockAccessoryProvider>,
) {
    let start = MonotonicInstant::now();

    for step in steps {
        let at = start + Duration::from_millis(step.at_ms);
        tokio::time::sleep_until(at.into_instant()).await;
        debug!(at_ms = step.at_ms, action = ?step.action, "Replaying step");

        match step.action {
            Action::Motion {
                stationary,
                automotive,
                confidence,
            } => {
                motion.push(ActivitySample {
                    stationary,
                    automotive,
                    walking: !stationary && !automotive,
                    ..ActivitySample::new(confidence)
                });
            }
            Action::AccessoryConnect { peripheral } => {
                accessory.simulate_connect(peripheral.as_str());
            }
            Action::AccessoryDisconnect { peripheral } => {
                accessory.simulate_disconnect(peripheral.as_str());
            }
            Action::GeofenceExit => {
                location.simulate_exit();
            }
            Action::Pause => {
                if let Err(err) = engine.pause_session(session_id) {
                    warn!(error = %err, "Pause step rejected");
                }
            }
            Action::Resume => {
                if let Err(err) = engine.resume_session(session_id) {
                    warn!(error = %err, "Resume step rejected");
                }
            }
            Action::ManualStop => match engine.stop_manual(session_id).await {
                Ok(CompletionOutcome::Completed { .. }) => {}
                Ok(outcome) => {
                    debug!(outcome = ?outcome, "Manual stop did not complete");
                }
                Err(err) => {
                    warn!(error = %err, "Manual stop rejected");
                }
            },
        }
    }

    debug!("Timeline exhausted");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "satcheld starting"
    );

    let service = Service::new(&args)?;
    service.run().await
}

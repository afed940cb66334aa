use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters used to derive runtime metrics.
#[derive(Default, Debug)]
pub struct Telemetry {
    commands_issued: AtomicU64,
    command_failures: AtomicU64,
    merged_lines: AtomicU64,
    nodes_aggregated: AtomicUsize,
    node_failures: AtomicUsize,
}

impl Telemetry {
    pub fn record_command_issued(&self) {
        self.commands_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_failure(&self) {
        self.command_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merged_lines(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.merged_lines.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_nodes_aggregated(&self, nodes: usize) {
        self.nodes_aggregated.store(nodes, Ordering::Relaxed);
    }

    pub fn record_node_failure(&self) {
        self.node_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands_issued(&self) -> u64 {
        self.commands_issued.load(Ordering::Relaxed)
    }

    pub fn command_failures(&self) -> u64 {
        self.command_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            commands_issued: self.commands_issued.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            merged_lines: self.merged_lines.load(Ordering::Relaxed),
            nodes_aggregated: self.nodes_aggregated.load(Ordering::Relaxed),
            node_failures: self.node_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub commands_issued: u64,
    pub command_failures: u64,
    pub merged_lines: u64,
    pub nodes_aggregated: usize,
    pub node_failures: usize,
}

/// Spawns a background task that periodically logs issuance progress and
/// failure counts while a plan executes. The task exits when `stop` flips.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    mut stop: watch::Receiver<bool>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so the log starts one
        // interval in.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let snapshot = telemetry.snapshot();
                    tracing::info!(
                        commands_issued = snapshot.commands_issued,
                        command_failures = snapshot.command_failures,
                        "plan execution progress"
                    );
                }
            }
        }
    })
}

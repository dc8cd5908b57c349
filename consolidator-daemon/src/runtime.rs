use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use consolidator_core::{DaemonConfig, LogFormat, Trigger};
use consolidator_engine::{
    execute_cycle, ChangeAuditor, CycleOutcome, CycleState, CycleSteps, CycleTriggers,
    DirectoryLock, FsCycle, Notification, Notifier,
};

use crate::error::{io_err, DaemonError};
use crate::error_record::ErrorRecordLayer;
use crate::notify::ChannelNotifier;
use crate::paths::DAEMON_LABEL;

/// Builds the steps for one cycle.
pub type StepsFactory = Box<dyn FnMut() -> Box<dyn CycleSteps + Send> + Send>;

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(config: DaemonConfig) -> Result<(), DaemonError> {
    init_tracing(config.log_format, &config.layout.error_log_path());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, ChannelNotifier::default()))
}

/// Run the control loop until SIGTERM or ctrl-c.
///
/// `SIGUSR1` requests a manual cycle, which starts on the next tick.
pub async fn run(config: DaemonConfig, notifier: ChannelNotifier) -> Result<(), DaemonError> {
    config.validate()?;
    config.layout.provision()?;

    let relay_handle = tokio::spawn(relay_notifications(notifier.subscribe()));

    let mut manual = signal(SignalKind::user_defined1())
        .map_err(|e| DaemonError::Runtime(format!("SIGUSR1 handler failed: {e}")))?;
    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| DaemonError::Runtime(format!("SIGTERM handler failed: {e}")))?;

    let mut ticker = tokio::time::interval(config.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        daemon = DAEMON_LABEL,
        schedule = %config.schedule,
        tick_secs = config.tick_secs,
        scan_interval_secs = config.scan_interval_secs,
        "daemon started",
    );

    let mut control = ControlLoop::new(config, Arc::new(notifier));
    let stopped = loop {
        tokio::select! {
            _ = ticker.tick() => {
                control.on_tick(Local::now());
                control.scan_changes(SystemTime::now()).await;
            }
            _ = manual.recv() => {
                if control.request_manual() {
                    tracing::info!("manual cycle requested");
                }
            }
            joined = join_in_flight(&mut control.in_flight) => {
                control.in_flight = None;
                control.settle(joined);
            }
            _ = terminate.recv() => {
                tracing::info!("received SIGTERM, shutting down daemon");
                break Ok(());
            }
            interrupted = tokio::signal::ctrl_c() => {
                match interrupted {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, shutting down daemon");
                        break Ok(());
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "ctrl-c handler failed, shutting down daemon");
                        break Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}")));
                    }
                }
            }
        }
    };

    let result = control.stop(stopped).await;
    relay_handle.abort();
    result
}

// ---------------------------------------------------------------------------
// Control loop state
// ---------------------------------------------------------------------------

/// Everything the loop owns between ticks.
pub struct ControlLoop {
    config: DaemonConfig,
    state: CycleState,
    triggers: CycleTriggers,
    auditor: ChangeAuditor,
    lock: DirectoryLock,
    steps: StepsFactory,
    in_flight: Option<JoinHandle<CycleOutcome>>,
}

impl ControlLoop {
    pub fn new(config: DaemonConfig, notifier: Arc<dyn Notifier>) -> Self {
        let layout = config.layout.clone();
        let steps: StepsFactory = Box::new(move || {
            Box::new(FsCycle::new(layout.clone(), notifier.clone())) as Box<dyn CycleSteps + Send>
        });
        Self::with_steps(config, steps)
    }

    pub fn with_steps(config: DaemonConfig, steps: StepsFactory) -> Self {
        Self {
            triggers: CycleTriggers::new(config.schedule),
            auditor: ChangeAuditor::new(config.scan_interval()),
            lock: DirectoryLock::for_layout(&config.layout),
            state: CycleState::default(),
            in_flight: None,
            steps,
            config,
        }
    }

    pub fn is_cycle_running(&self) -> bool {
        self.state.is_running()
    }

    /// Record an operator trigger; `false` when it was dropped.
    pub fn request_manual(&mut self) -> bool {
        self.triggers.request_manual(&self.state)
    }

    /// Start whichever cycle is due at `now`, if any.
    pub fn on_tick(&mut self, now: DateTime<Local>) {
        if let Some(trigger) = self.triggers.take_due(&self.state, &now) {
            self.start_cycle(trigger, now);
        }
    }

    fn start_cycle(&mut self, trigger: Trigger, now: DateTime<Local>) -> bool {
        if !self.state.try_begin() {
            tracing::info!(trigger = %trigger, "cycle already running; trigger ignored");
            return false;
        }
        let mut steps = (self.steps)();
        self.in_flight = Some(tokio::task::spawn_blocking(move || {
            execute_cycle(steps.as_mut(), trigger, now)
        }));
        true
    }

    /// Wait for the in-flight cycle, if any, and return its outcome.
    pub async fn wait_for_cycle(&mut self) -> Option<CycleOutcome> {
        let handle = self.in_flight.take()?;
        self.settle(handle.await)
    }

    /// Back to Idle. A cycle task that died is followed by a forced unlock.
    fn settle(&mut self, joined: Result<CycleOutcome, JoinError>) -> Option<CycleOutcome> {
        let outcome = match joined {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(error = %err, "cycle task join failure");
                if let Err(err) = self.lock.force_unlock() {
                    tracing::error!(error = %err, "forced unlock failed");
                }
                None
            }
        };
        self.state.finish();
        outcome
    }

    /// Run the change auditor if it is due. Deferred while a cycle runs.
    pub async fn scan_changes(&mut self, now: SystemTime) {
        if self.state.is_running() || !self.auditor.is_due(now) {
            return;
        }

        let mut auditor = self.auditor.clone();
        let layout = self.config.layout.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            let report = auditor.scan(&layout, now);
            (auditor, report)
        })
        .await;

        match scanned {
            Ok((auditor, report)) => {
                self.auditor = auditor;
                if let Some(report) = report.filter(|r| !r.records.is_empty()) {
                    tracing::info!(records = report.records.len(), "recorded file changes");
                }
            }
            Err(err) => tracing::error!(error = %err, "change scan task join failure"),
        }
    }

    /// Wait for an in-flight cycle; directories are never left locked.
    pub async fn shutdown(&mut self) {
        if self.in_flight.is_some() {
            tracing::info!("waiting for in-flight cycle before exit");
            self.wait_for_cycle().await;
        }
        if self.state.is_running() {
            if let Err(err) = self.lock.force_unlock() {
                tracing::error!(error = %err, "forced unlock failed");
            }
            self.state.finish();
        }
        tracing::info!("daemon stopped");
    }

    /// Shut down whatever ended the loop, then hand back the reason.
    pub async fn stop(&mut self, stopped: Result<(), DaemonError>) -> Result<(), DaemonError> {
        self.shutdown().await;
        stopped
    }
}

async fn join_in_flight(
    slot: &mut Option<JoinHandle<CycleOutcome>>,
) -> Result<CycleOutcome, JoinError> {
    match slot {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn relay_notifications(mut rx: broadcast::Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => tracing::debug!(notification = notification.as_str(), "notification"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "notification relay lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Console output on stderr filtered by `RUST_LOG` (default `info`), plus the
/// error record file, which sees every error-level event regardless of the
/// filter.
pub fn init_tracing(format: LogFormat, error_log: &Path) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(ErrorRecordLayer::new(error_log));
    let _ = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_filter(filter),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_filter(filter),
            )
            .try_init(),
    };
}

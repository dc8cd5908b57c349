//! Cycle orchestrator.
//!
//! A cycle is: lock → snapshot → transfer → (scheduled only) completeness →
//! unlock. [`CycleState`] guarantees at most one cycle at a time; a trigger
//! that arrives while a cycle is running is dropped, not queued.
//!
//! Both pieces of state ([`CycleState`], [`CycleTriggers`]) are plain values
//! owned by the caller's control loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use consolidator_core::{DailySchedule, Layout, Trigger};

use crate::completeness::{check_completeness, CompletenessReport};
use crate::error::EngineError;
use crate::lock::DirectoryLock;
use crate::notify::Notifier;
use crate::snapshot::{snapshot_reporting, SnapshotReport};
use crate::transfer::{transfer_uploads, TransferReport};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The operations a cycle sequences.
pub trait CycleSteps {
    fn lock(&mut self) -> Result<(), EngineError>;
    fn unlock(&mut self) -> Result<(), EngineError>;
    fn snapshot(&mut self, now: &DateTime<Local>) -> Result<SnapshotReport, EngineError>;
    fn transfer(&mut self) -> TransferReport;
    fn check_completeness(&mut self, date: NaiveDate) -> CompletenessReport;
}

/// Cycle steps against the real filesystem layout.
pub struct FsCycle {
    layout: Layout,
    lock: DirectoryLock,
    notifier: Arc<dyn Notifier>,
}

impl FsCycle {
    pub fn new(layout: Layout, notifier: Arc<dyn Notifier>) -> Self {
        let lock = DirectoryLock::for_layout(&layout);
        Self {
            layout,
            lock,
            notifier,
        }
    }
}

impl CycleSteps for FsCycle {
    fn lock(&mut self) -> Result<(), EngineError> {
        self.lock.lock()
    }

    fn unlock(&mut self) -> Result<(), EngineError> {
        self.lock.unlock()
    }

    fn snapshot(&mut self, now: &DateTime<Local>) -> Result<SnapshotReport, EngineError> {
        snapshot_reporting(&self.layout, now, self.notifier.as_ref())
    }

    fn transfer(&mut self) -> TransferReport {
        transfer_uploads(&self.layout, self.notifier.as_ref())
    }

    fn check_completeness(&mut self, date: NaiveDate) -> CompletenessReport {
        check_completeness(&self.layout.reporting_root, date)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Idle / Running.
#[derive(Debug, Default)]
pub struct CycleState {
    running: bool,
}

impl CycleState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Idle → Running. Returns `false` (and changes nothing) when already running.
    pub fn try_begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Running → Idle.
    pub fn finish(&mut self) {
        self.running = false;
    }
}

/// Decides, once per tick, whether a cycle should start and which kind.
#[derive(Debug, Clone)]
pub struct CycleTriggers {
    schedule: DailySchedule,
    last_scheduled: Option<NaiveDate>,
    manual_requested: bool,
}

impl CycleTriggers {
    pub fn new(schedule: DailySchedule) -> Self {
        Self {
            schedule,
            last_scheduled: None,
            manual_requested: false,
        }
    }

    /// Record an operator trigger. Dropped (returns `false`) while a cycle runs.
    pub fn request_manual(&mut self, state: &CycleState) -> bool {
        if state.is_running() {
            tracing::info!("cycle already running; manual trigger ignored");
            return false;
        }
        self.manual_requested = true;
        true
    }

    #[cfg(test)]
    fn manual_pending(&self) -> bool {
        self.manual_requested
    }

    /// The cycle to start now, if any. The scheduled trigger fires at most
    /// once per local date and absorbs a pending manual request.
    pub fn take_due(&mut self, state: &CycleState, now: &DateTime<Local>) -> Option<Trigger> {
        if state.is_running() {
            if std::mem::take(&mut self.manual_requested) {
                tracing::info!("cycle already running; manual trigger ignored");
            }
            return None;
        }

        let today = now.date_naive();
        if self.schedule.matches(now) && self.last_scheduled != Some(today) {
            self.last_scheduled = Some(today);
            self.manual_requested = false;
            return Some(Trigger::Scheduled);
        }

        if std::mem::take(&mut self.manual_requested) {
            return Some(Trigger::Manual);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub trigger: Trigger,
    pub started_at: DateTime<Local>,
    /// `None` when the snapshot as a whole failed.
    pub snapshot: Option<SnapshotReport>,
    pub transfer: TransferReport,
    /// Present for scheduled cycles only.
    pub completeness: Option<CompletenessReport>,
    pub unlocked: bool,
    pub duration_ms: u128,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Another cycle was running; nothing happened.
    Skipped,
    /// The directories could not be locked; snapshot and transfer were skipped.
    LockFailed(EngineError),
    Completed(CycleSummary),
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one cycle if none is running, leaving `state` idle afterwards.
pub fn run_cycle<S: CycleSteps>(
    state: &mut CycleState,
    steps: &mut S,
    trigger: Trigger,
    now: DateTime<Local>,
) -> CycleOutcome {
    if !state.try_begin() {
        tracing::info!(trigger = %trigger, "cycle already running; trigger ignored");
        return CycleOutcome::Skipped;
    }
    let outcome = execute_cycle(steps, trigger, now);
    state.finish();
    outcome
}

/// The body of a cycle. The caller owns the Idle/Running transition.
pub fn execute_cycle<S: CycleSteps + ?Sized>(
    steps: &mut S,
    trigger: Trigger,
    now: DateTime<Local>,
) -> CycleOutcome {
    tracing::info!(trigger = %trigger, "starting {trigger} backup and transfer");
    let started = Instant::now();

    if let Err(err) = steps.lock() {
        tracing::error!(error = %err, "could not lock directories; skipping cycle");
        return CycleOutcome::LockFailed(err);
    }

    let snapshot = match steps.snapshot(&now) {
        Ok(report) => Some(report),
        Err(err) => {
            tracing::error!(error = %err, "snapshot failed; continuing with transfer");
            None
        }
    };

    let transfer = steps.transfer();

    let completeness = trigger
        .checks_completeness()
        .then(|| steps.check_completeness(now.date_naive()));

    let unlocked = match steps.unlock() {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "could not unlock directories");
            false
        }
    };

    let summary = CycleSummary {
        trigger,
        started_at: now,
        snapshot,
        transfer,
        completeness,
        unlocked,
        duration_ms: started.elapsed().as_millis(),
    };
    tracing::info!(
        trigger = %trigger,
        transferred = summary.transfer.transferred.len(),
        duration_ms = summary.duration_ms,
        "cycle completed",
    );
    CycleOutcome::Completed(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

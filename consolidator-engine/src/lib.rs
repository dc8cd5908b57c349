//! # consolidator-engine
//!
//! Filesystem work for one consolidation cycle, plus the change auditor.
//!
//! - [`lock`]: chmod-based upload/reporting lock
//! - [`snapshot`]: reporting directory → timestamped backup
//! - [`transfer`]: department uploads → reporting directory
//! - [`completeness`]: did every department deliver today's file?
//! - [`changes`]: periodic mtime scan written to the change log
//! - [`cycle`]: sequencing, single-flight state, trigger selection

pub mod changes;
pub mod completeness;
pub mod copy;
pub mod cycle;
pub mod error;
pub mod lock;
pub mod notify;
pub mod snapshot;
pub mod transfer;

pub use changes::{AuditRecord, ChangeAuditor, ScanReport};
pub use completeness::{check_completeness, CompletenessReport, MissingUpload};
pub use cycle::{
    execute_cycle, run_cycle, CycleOutcome, CycleState, CycleSteps, CycleSummary, CycleTriggers,
    FsCycle,
};
pub use error::EngineError;
pub use lock::DirectoryLock;
pub use notify::{Notification, Notifier, NullNotifier};
pub use snapshot::{snapshot_reporting, SnapshotReport};
pub use transfer::{transfer_uploads, TransferReport, TransferredFile};

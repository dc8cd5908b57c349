use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, TimeZone};
use consolidator_core::{Department, Layout, Trigger};
use consolidator_engine::{
    lock::{LOCKED_MODE, UNLOCKED_MODE},
    run_cycle, transfer_uploads, CycleOutcome, CycleState, CycleSteps, FsCycle, Notification,
    Notifier, NullNotifier,
};
use filetime::{set_file_times, FileTime};
use tempfile::TempDir;

#[derive(Default)]
struct Recorded(Mutex<Vec<Notification>>);

impl Recorded {
    fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.0.lock().expect("notifications"))
    }
}

impl Notifier for Recorded {
    fn notify(&self, notification: Notification) {
        self.0.lock().expect("notifications").push(notification);
    }
}

fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

fn provisioned() -> (TempDir, Layout) {
    let base = TempDir::new().expect("base");
    let layout = Layout::under(base.path());
    layout.provision().expect("provision");
    (base, layout)
}

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).expect("metadata").permissions().mode() & 0o777
}

#[test]
fn transfer_keeps_source_timestamps() {
    let (_base, layout) = provisioned();
    let src = layout
        .department_dir(Department::Manufacturing)
        .join("manufacturing_20240301.xml");
    fs::write(&src, b"<m/>").expect("write upload");
    let atime = FileTime::from_unix_time(1_600_000_000, 0);
    let mtime = FileTime::from_unix_time(1_600_000_100, 0);
    set_file_times(&src, atime, mtime).expect("set times");

    let report = transfer_uploads(&layout, &NullNotifier);

    assert_eq!(report.failures, 0);
    let dst = layout.reporting_root.join("manufacturing_20240301.xml");
    let meta = fs::metadata(&dst).expect("destination exists");
    assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
    assert_eq!(FileTime::from_last_access_time(&meta), atime);
    assert!(!src.exists());
}

#[test]
fn transfer_keeps_source_owner() {
    if !running_as_root() {
        eprintln!("skipping: ownership transfer needs root");
        return;
    }
    let (_base, layout) = provisioned();
    let src = layout.department_dir(Department::Sales).join("sales_20240301.xml");
    fs::write(&src, b"<s/>").expect("write upload");
    nix::unistd::chown(
        &src,
        Some(nix::unistd::Uid::from_raw(4242)),
        Some(nix::unistd::Gid::from_raw(4343)),
    )
    .expect("chown source");

    transfer_uploads(&layout, &NullNotifier);

    let meta = fs::metadata(layout.reporting_root.join("sales_20240301.xml")).expect("dst");
    assert_eq!(meta.uid(), 4242);
    assert_eq!(meta.gid(), 4343);
}

#[test]
fn lock_failure_leaves_no_backup_and_no_transfer() {
    let (_base, layout) = provisioned();
    let upload = layout.department_dir(Department::Sales).join("sales_20240301.xml");
    fs::write(&upload, b"<s/>").expect("write upload");
    fs::remove_dir_all(&layout.reporting_root).expect("remove reporting root");

    let notifier = Arc::new(Recorded::default());
    let mut steps = FsCycle::new(layout.clone(), notifier.clone());
    let mut state = CycleState::default();
    let now = Local.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();

    let outcome = run_cycle(&mut state, &mut steps, Trigger::Scheduled, now);

    assert!(matches!(outcome, CycleOutcome::LockFailed(_)));
    assert!(upload.exists(), "upload must stay in place");
    assert_eq!(fs::read_dir(&layout.backup_root).unwrap().count(), 0);
    assert_eq!(mode_of(&layout.upload_root), UNLOCKED_MODE);
    assert!(notifier.take().is_empty());
    assert!(!state.is_running());
}

#[test]
fn steps_lock_and_unlock_the_real_directories() {
    let (_base, layout) = provisioned();
    let mut steps = FsCycle::new(layout.clone(), Arc::new(NullNotifier));

    steps.lock().expect("lock");
    assert_eq!(mode_of(&layout.upload_root), LOCKED_MODE);
    assert_eq!(mode_of(&layout.reporting_root), LOCKED_MODE);

    steps.unlock().expect("unlock");
    assert_eq!(mode_of(&layout.upload_root), UNLOCKED_MODE);
    assert_eq!(mode_of(&layout.reporting_root), UNLOCKED_MODE);
}

#[test]
fn scheduled_cycle_end_to_end() {
    // A locked reporting root is read-only for everyone but root.
    if !running_as_root() {
        eprintln!("skipping: writing into a locked directory needs root");
        return;
    }
    let (_base, layout) = provisioned();
    fs::write(layout.reporting_root.join("previous.xml"), b"old").expect("seed reporting");
    for department in [Department::Warehouse, Department::Sales] {
        let name = department.expected_file_name(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        fs::write(layout.department_dir(department).join(name), b"<d/>").expect("upload");
    }

    let notifier = Arc::new(Recorded::default());
    let mut steps = FsCycle::new(layout.clone(), notifier.clone());
    let mut state = CycleState::default();
    let now = Local.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();

    let CycleOutcome::Completed(summary) =
        run_cycle(&mut state, &mut steps, Trigger::Scheduled, now)
    else {
        panic!("cycle should complete");
    };

    let snapshot = summary.snapshot.expect("snapshot ran");
    assert_eq!(snapshot.copied, vec!["previous.xml".to_string()]);
    assert_eq!(summary.transfer.transferred.len(), 2);

    let completeness = summary.completeness.expect("scheduled cycle checks completeness");
    let missing: Vec<_> = completeness.missing.iter().map(|m| m.department).collect();
    assert_eq!(missing, vec![Department::Manufacturing, Department::Distribution]);

    assert!(summary.unlocked);
    assert_eq!(mode_of(&layout.upload_root), UNLOCKED_MODE);
    assert_eq!(mode_of(&layout.reporting_root), UNLOCKED_MODE);
    assert_eq!(
        notifier.take(),
        vec![
            Notification::BackupStarted,
            Notification::BackupCompleted,
            Notification::TransferStarted,
            Notification::TransferCompleted,
        ]
    );
}

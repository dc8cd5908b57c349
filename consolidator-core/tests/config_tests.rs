//! Config loading, error-message and provisioning integration tests.

use assert_fs::prelude::*;
use consolidator_core::{
    config::{self, CHANGE_LOG, ERROR_LOG},
    ConfigError, DaemonConfig, Department, LogFormat,
};
use predicates::prelude::predicate;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(&dir.path().join("consolidator.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config not found"));
    assert!(err.to_string().contains("consolidator.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.write_str("schedule: [unclosed\n  - : broken").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("consolidator.yaml"));
}

#[test]
fn load_rejects_invalid_schedule() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.write_str("schedule:\n  hour: 25\n  minute: 0\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSchedule { hour: 25, minute: 0 }));
}

// ---------------------------------------------------------------------------
// 2. Partial files take defaults
// ---------------------------------------------------------------------------

#[test]
fn partial_config_fills_in_defaults() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.write_str(
        "layout:\n  reporting_root: /srv/reporting\nschedule:\n  hour: 2\n  minute: 30\nlog_format: json\n",
    )
    .expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    let defaults = DaemonConfig::default();
    assert_eq!(loaded.layout.reporting_root, std::path::PathBuf::from("/srv/reporting"));
    assert_eq!(loaded.layout.upload_root, defaults.layout.upload_root);
    assert_eq!((loaded.schedule.hour, loaded.schedule.minute), (2, 30));
    assert_eq!(loaded.tick_secs, 60);
    assert_eq!(loaded.scan_interval_secs, 300);
    assert_eq!(loaded.log_format, LogFormat::Json);
}

#[test]
fn schedule_with_only_minute_keeps_default_hour() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.write_str("schedule:\n  minute: 30\n").expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    assert_eq!((loaded.schedule.hour, loaded.schedule.minute), (1, 30));
}

#[test]
fn schedule_with_only_hour_keeps_default_minute() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.write_str("schedule:\n  hour: 4\n").expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    assert_eq!((loaded.schedule.hour, loaded.schedule.minute), (4, 0));
}

#[test]
fn empty_file_is_the_default_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("consolidator.yaml");
    file.touch().expect("touch");
    assert_eq!(config::load_at(file.path()).expect("load"), DaemonConfig::default());
}

// ---------------------------------------------------------------------------
// 3. Save
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_preserves_config_and_cleans_tmp() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("etc").join("consolidator.yaml");
    let mut cfg = DaemonConfig::default();
    cfg.layout = consolidator_core::Layout::under(dir.path());
    cfg.scan_interval_secs = 120;

    config::save_at(&path, &cfg).expect("save");
    assert_eq!(config::load_at(&path).expect("load"), cfg);
    dir.child("etc/consolidator.yaml.tmp")
        .assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 4. Provisioning
// ---------------------------------------------------------------------------

#[test]
fn provision_is_idempotent_and_keeps_existing_modes() {
    let base = assert_fs::TempDir::new().expect("tempdir");
    let layout = consolidator_core::Layout::under(base.path());
    layout.provision().expect("first provision");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&layout.upload_root, fs::Permissions::from_mode(0o555))
            .expect("chmod");
        layout.provision().expect("second provision");
        let mode = fs::metadata(&layout.upload_root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o555, "provision must not reset existing directories");
        fs::set_permissions(&layout.upload_root, fs::Permissions::from_mode(0o755))
            .expect("restore");
    }

    for department in Department::ALL {
        base.child(format!("upload/{department}"))
            .assert(predicate::path::is_dir());
    }
}

#[test]
fn log_paths_live_in_log_dir() {
    let base = assert_fs::TempDir::new().expect("tempdir");
    let layout = consolidator_core::Layout::under(base.path());
    assert_eq!(layout.change_log_path(), base.path().join("logs").join(CHANGE_LOG));
    assert_eq!(layout.error_log_path(), base.path().join("logs").join(ERROR_LOG));
}

//! Roundtrip serialisation tests for `consolidator-core` types.
//!
//! Each `#[case]` is isolated: no shared state.

use consolidator_core::types::{DailySchedule, Department, Trigger};
use consolidator_core::{DaemonConfig, Layout, LogFormat};
use rstest::rstest;
use std::path::Path;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn custom_config() -> DaemonConfig {
    DaemonConfig {
        layout: Layout::under(Path::new("/srv/intake")),
        schedule: DailySchedule { hour: 23, minute: 45 },
        tick_secs: 30,
        scan_interval_secs: 600,
        log_format: LogFormat::Json,
    }
}

// ---------------------------------------------------------------------------
// Parameterised roundtrip test
// ---------------------------------------------------------------------------

#[rstest]
#[case("defaults", DaemonConfig::default())]
#[case("all_fields", custom_config())]
fn config_roundtrip(#[case] label: &str, #[case] config: DaemonConfig) {
    let yaml = serde_yaml::to_string(&config)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: DaemonConfig = serde_yaml::from_str(&yaml)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(config, back, "[{label}] config");
}

// ---------------------------------------------------------------------------
// Department names on the wire match the upload subdirectories
// ---------------------------------------------------------------------------

#[rstest]
#[case(Department::Warehouse, "warehouse")]
#[case(Department::Manufacturing, "manufacturing")]
#[case(Department::Sales, "sales")]
#[case(Department::Distribution, "distribution")]
fn department_serializes_as_directory_name(#[case] department: Department, #[case] name: &str) {
    let yaml = serde_yaml::to_string(&department).expect("serialize");
    assert_eq!(yaml.trim(), name);
    let back: Department = serde_yaml::from_str(name).expect("deserialize");
    assert_eq!(back, department);
    assert_eq!(department.as_str(), name);
}

#[rstest]
#[case(Trigger::Scheduled, "scheduled")]
#[case(Trigger::Manual, "manual")]
fn trigger_serializes_lowercase(#[case] trigger: Trigger, #[case] name: &str) {
    let yaml = serde_yaml::to_string(&trigger).expect("serialize");
    assert_eq!(yaml.trim(), name);
}

//! Completeness auditor: did every department deliver today's file?
//!
//! Findings are logged at error level but never fail a cycle.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use consolidator_core::Department;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingUpload {
    pub department: Department,
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub date: NaiveDate,
    pub present: Vec<Department>,
    pub missing: Vec<MissingUpload>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Look for `{department}_{YYYYMMDD}.xml` directly under `reporting_root`.
pub fn check_completeness(reporting_root: &Path, date: NaiveDate) -> CompletenessReport {
    tracing::info!(date = %date, "checking for missing uploads");

    let mut present = Vec::new();
    let mut missing = Vec::new();
    for department in Department::ALL {
        let expected = department.expected_file_name(date);
        if reporting_root.join(&expected).exists() {
            present.push(department);
        } else {
            tracing::error!(
                "missing upload from department {}: {}",
                department,
                expected,
            );
            missing.push(MissingUpload {
                department,
                expected,
            });
        }
    }

    CompletenessReport {
        date,
        present,
        missing,
    }
}

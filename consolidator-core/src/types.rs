//! Domain types shared by the engine, the daemon and the CLI.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Department
// ---------------------------------------------------------------------------

/// One of the fixed upload sources.
///
/// Each department owns exactly one upload subdirectory, named after
/// [`Department::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Warehouse,
    Manufacturing,
    Sales,
    Distribution,
}

impl Department {
    /// Every department, in processing order.
    pub const ALL: [Department; 4] = [
        Department::Warehouse,
        Department::Manufacturing,
        Department::Sales,
        Department::Distribution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Department::Warehouse => "warehouse",
            Department::Manufacturing => "manufacturing",
            Department::Sales => "sales",
            Department::Distribution => "distribution",
        }
    }

    /// `{department}_{YYYYMMDD}.xml`: the end-of-day submission expected for `date`.
    pub fn expected_file_name(self, date: NaiveDate) -> String {
        format!("{}_{}.xml", self.as_str(), date.format("%Y%m%d"))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown department '{s}'; expected: warehouse, manufacturing, sales, distribution"
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// What started a consolidation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// The daily wall-clock trigger. Runs the completeness check.
    Scheduled,
    /// An operator request. Backup + transfer only.
    Manual,
}

impl Trigger {
    pub fn checks_completeness(self) -> bool {
        matches!(self, Trigger::Scheduled)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

// ---------------------------------------------------------------------------
// DailySchedule
// ---------------------------------------------------------------------------

/// Local wall-clock minute at which the scheduled cycle fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self { hour: 1, minute: 0 }
    }
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        let schedule = Self { hour, minute };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hour >= 24 || self.minute >= 60 {
            return Err(ConfigError::InvalidSchedule {
                hour: self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }

    /// True when `now` falls inside the trigger minute.
    pub fn matches<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn department_display_matches_directory_name() {
        assert_eq!(Department::Warehouse.to_string(), "warehouse");
        assert_eq!(Department::Distribution.to_string(), "distribution");
    }

    #[test]
    fn department_from_str_is_case_insensitive() {
        assert_eq!("Sales".parse::<Department>(), Ok(Department::Sales));
        assert!("marketing".parse::<Department>().is_err());
    }

    #[test]
    fn expected_file_name_uses_compact_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            Department::Manufacturing.expected_file_name(date),
            "manufacturing_20240307.xml"
        );
    }

    #[test]
    fn only_scheduled_trigger_checks_completeness() {
        assert!(Trigger::Scheduled.checks_completeness());
        assert!(!Trigger::Manual.checks_completeness());
    }

    #[test]
    fn schedule_matches_whole_minute() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let schedule = DailySchedule::default();
        let at = |h, m, s| tz.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap();
        assert!(schedule.matches(&at(1, 0, 0)));
        assert!(schedule.matches(&at(1, 0, 59)));
        assert!(!schedule.matches(&at(1, 1, 0)));
        assert!(!schedule.matches(&at(13, 0, 0)));
    }

    #[test]
    fn schedule_rejects_out_of_range_values() {
        assert!(DailySchedule::new(24, 0).is_err());
        assert!(DailySchedule::new(0, 60).is_err());
        assert_eq!(DailySchedule::new(23, 59).unwrap().to_string(), "23:59");
    }
}

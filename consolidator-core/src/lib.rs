//! Consolidator core library: domain types, directory layout, configuration.
//!
//! - [`types`]: departments, triggers, the daily schedule
//! - [`config`]: [`Layout`], [`DaemonConfig`], YAML load / save
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{DaemonConfig, Layout, LogFormat};
pub use error::ConfigError;
pub use types::{DailySchedule, Department, Trigger};

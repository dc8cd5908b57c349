//! Daemon configuration and the fixed directory layout.
//!
//! # Layout
//!
//! ```text
//! <upload_root>/
//!   warehouse/ manufacturing/ sales/ distribution/
//! <reporting_root>/
//! <backup_root>/
//!   backup_YYYYMMDD_HHMMSS[_N]/
//! <log_dir>/
//!   changes.log   (audit records)
//!   errors.log    (error records)
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: the file must exist
//! - `load_or_default_at(path)`: a missing file yields [`DaemonConfig::default`]
//!
//! Every key in the YAML file is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{DailySchedule, Department};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/consolidator/consolidator.yaml";
pub const CHANGE_LOG: &str = "changes.log";
pub const ERROR_LOG: &str = "errors.log";

/// Mode applied to directories created by [`Layout::provision`].
pub const PROVISION_MODE: u32 = 0o755;

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub upload_root: PathBuf,
    pub reporting_root: PathBuf,
    pub backup_root: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::under(Path::new("/var/company"))
    }
}

impl Layout {
    /// `upload/`, `reporting/`, `backup/` and `logs/` under a single base directory.
    pub fn under(base: &Path) -> Self {
        Self {
            upload_root: base.join("upload"),
            reporting_root: base.join("reporting"),
            backup_root: base.join("backup"),
            log_dir: base.join("logs"),
        }
    }

    /// `<upload_root>/<department>`: pure, no I/O.
    pub fn department_dir(&self, department: Department) -> PathBuf {
        self.upload_root.join(department.as_str())
    }

    pub fn change_log_path(&self) -> PathBuf {
        self.log_dir.join(CHANGE_LOG)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.log_dir.join(ERROR_LOG)
    }

    /// Create any missing directory of the layout with mode `0755`.
    ///
    /// Existing directories are left untouched, including their permissions.
    pub fn provision(&self) -> Result<(), ConfigError> {
        let mut dirs = vec![
            self.upload_root.clone(),
            self.reporting_root.clone(),
            self.backup_root.clone(),
            self.log_dir.clone(),
        ];
        dirs.extend(Department::ALL.iter().map(|d| self.department_dir(*d)));

        for dir in dirs {
            if dir.exists() {
                continue;
            }
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
            set_dir_permissions(&dir)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. DaemonConfig
// ---------------------------------------------------------------------------

/// Console log rendering for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub layout: Layout,
    pub schedule: DailySchedule,
    /// Control loop wake-up period.
    pub tick_secs: u64,
    /// Minimum spacing between change scans.
    pub scan_interval_secs: u64,
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            schedule: DailySchedule::default(),
            tick_secs: 60,
            scan_interval_secs: 300,
            log_format: LogFormat::Text,
        }
    }
}

impl DaemonConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.validate()?;
        if self.tick_secs == 0 {
            return Err(ConfigError::InvalidInterval { field: "tick_secs" });
        }
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval {
                field: "scan_interval_secs",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<DaemonConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: DaemonConfig = if contents.trim().is_empty() {
        DaemonConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Like [`load_at`], but a missing file yields the defaults.
pub fn load_or_default_at(path: &Path) -> Result<DaemonConfig, ConfigError> {
    match load_at(path) {
        Err(ConfigError::ConfigNotFound { .. }) => Ok(DaemonConfig::default()),
        other => other,
    }
}

/// Render `config` the way [`save_at`] writes it.
pub fn to_yaml(config: &DaemonConfig) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(config)?)
}

/// Write `config` to `path` via a `.tmp` sibling and `rename`.
pub fn save_at(path: &Path, config: &DaemonConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, to_yaml(config)?).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(PROVISION_MODE))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_layout_matches_company_tree() {
        let layout = Layout::default();
        assert_eq!(layout.upload_root, PathBuf::from("/var/company/upload"));
        assert_eq!(
            layout.error_log_path(),
            PathBuf::from("/var/company/logs/errors.log")
        );
        assert_eq!(
            layout.department_dir(Department::Sales),
            PathBuf::from("/var/company/upload/sales")
        );
    }

    #[test]
    fn provision_creates_every_directory() {
        let base = TempDir::new().expect("tempdir");
        let layout = Layout::under(base.path());
        layout.provision().expect("provision");

        for department in Department::ALL {
            assert!(layout.department_dir(department).is_dir());
        }
        assert!(layout.reporting_root.is_dir());
        assert!(layout.backup_root.is_dir());
        assert!(layout.log_dir.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&layout.reporting_root)
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o755);
        }
    }

    #[test]
    fn load_missing_config_returns_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_at(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_or_default_at(&dir.path().join("absent.yaml")).expect("load");
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = DaemonConfig {
            tick_secs: 0,
            ..DaemonConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tick_secs"));
    }
}

//! Consolidation daemon: tick-driven control loop, signal handling, durable
//! error records and the notification channel.

mod error;
pub mod error_record;
pub mod notify;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use error_record::ErrorRecordLayer;
pub use notify::ChannelNotifier;
pub use paths::resolve_config_path;
pub use runtime::{init_tracing, run, start_blocking, ControlLoop, StepsFactory};

//! Logging setup and runtime monitoring of indicator contexts.

mod logging;
mod observer;

pub use logging::{setup_logging, LogFormat};
pub use observer::{ContextMonitor, MonitorStats};

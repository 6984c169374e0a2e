//! Process-wide tracing setup for binaries and test harnesses embedding the
//! procurement crates. Library code only emits `tracing` events.

/// Tracing subscriber configuration and installation.
pub mod tracing;

pub use crate::tracing::{ConfigError, LogFormat, ObservabilityConfig};

/// Install the global subscriber configured from the environment.
///
/// Safe to call multiple times; later calls are no-ops. An unparsable
/// `PROCURA_LOG_FORMAT` falls back to JSON output.
pub fn init() {
    let config = ObservabilityConfig::from_env().unwrap_or_default();
    config.init();
}

//! Tracing and logging setup shared by binaries and test harnesses.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init_with(&ObservabilityConfig::default());
}

pub use self::tracing::{ObservabilityConfig, init_with};

/// Tracing configuration (filters, layers).
pub mod tracing;

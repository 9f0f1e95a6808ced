//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Output settings for [`init_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset or unparseable.
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json: true,
            default_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn plain() -> Self {
        Self {
            json: false,
            ..Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        self.filter_from(from_env.as_deref())
    }

    /// `directives` first, then `default_filter`, then plain `info`.
    fn filter_from(&self, directives: Option<&str>) -> EnvFilter {
        directives
            .and_then(|d| EnvFilter::try_new(d).ok())
            .or_else(|| EnvFilter::try_new(&self.default_filter).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the call is then a
/// no-op.
pub fn init_with(config: &ObservabilityConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        ::tracing::debug!(json = config.json, "tracing initialized");
    }
    installed
}

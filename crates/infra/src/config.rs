//! Runtime configuration loaded from environment variables.

use std::str::FromStr;

use anyhow::Context;
use spm_observability::ObservabilityConfig;

pub const MAX_ANCESTOR_WALK_VAR: &str = "SPM_MAX_ANCESTOR_WALK";
pub const SUGGESTION_LIMIT_VAR: &str = "SPM_SUGGESTION_LIMIT";
pub const RECENT_WINDOW_HOURS_VAR: &str = "SPM_RECENT_WINDOW_HOURS";
pub const LOG_JSON_VAR: &str = "SPM_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpmConfig {
    /// Step cap for upward parent walks (cycle checks, breadcrumbs).
    pub max_ancestor_walk: usize,
    /// Maximum number of category suggestions returned.
    pub suggestion_limit: usize,
    /// Default look-back window for "recently updated" queries.
    pub recent_window_hours: u32,
    /// JSON log lines instead of plain text.
    pub log_json: bool,
}

impl Default for SpmConfig {
    fn default() -> Self {
        Self {
            max_ancestor_walk: 1024,
            suggestion_limit: 5,
            recent_window_hours: 24,
            log_json: true,
        }
    }
}

impl SpmConfig {
    /// Read the process environment. Absent variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SpmConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_ancestor_walk: parse_or(&lookup, MAX_ANCESTOR_WALK_VAR, defaults.max_ancestor_walk)?,
            suggestion_limit: parse_or(&lookup, SUGGESTION_LIMIT_VAR, defaults.suggestion_limit)?,
            recent_window_hours: parse_or(
                &lookup,
                RECENT_WINDOW_HOURS_VAR,
                defaults.recent_window_hours,
            )?,
            log_json: parse_or(&lookup, LOG_JSON_VAR, defaults.log_json)?,
        };

        if config.max_ancestor_walk == 0 {
            anyhow::bail!("{MAX_ANCESTOR_WALK_VAR} must be greater than zero");
        }
        if config.suggestion_limit == 0 {
            tracing::warn!(
                var = SUGGESTION_LIMIT_VAR,
                "suggestion limit is zero; category suggestions will always be empty"
            );
        }
        Ok(config)
    }

    /// Logging settings derived from this configuration.
    pub fn observability(&self) -> ObservabilityConfig {
        ObservabilityConfig {
            json: self.log_json,
            ..ObservabilityConfig::default()
        }
    }

    /// Install the process-wide subscriber. Later calls are no-ops.
    pub fn init_tracing(&self) -> bool {
        spm_observability::init_with(&self.observability())
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + core::fmt::Debug,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => {
            tracing::debug!(var = key, ?default, "not set, using default");
            Ok(default)
        }
    }
}

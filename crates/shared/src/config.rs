//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ledger engine settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Which entry statuses may be backvalued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackvaluePolicy {
    /// Both pending and posted entries may be re-dated.
    #[default]
    PendingOrPosted,
    /// Only entries that have not been posted yet may be re-dated.
    PendingOnly,
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Topic the posting workflow publishes domain events to.
    #[serde(default = "default_events_topic")]
    pub events_topic: String,
    /// Reject postings whose effective date falls in a closed fiscal period.
    #[serde(default = "default_enforce_period_gating")]
    pub enforce_period_gating: bool,
    /// Which entries may be backvalued.
    #[serde(default)]
    pub backvalue_policy: BackvaluePolicy,
}

fn default_events_topic() -> String {
    "ledger.entries".to_string()
}

fn default_enforce_period_gating() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            events_topic: default_events_topic(),
            enforce_period_gating: default_enforce_period_gating(),
            backvalue_policy: BackvaluePolicy::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "corebank=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier: `config/default`,
    /// `config/{RUN_MODE}`, then `COREBANK__*` environment variables
    /// (e.g. `COREBANK__LEDGER__EVENTS_TOPIC`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COREBANK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

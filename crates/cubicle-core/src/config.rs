//! Configuration loading and typed config structures for the Cubicle engine.
//!
//! The canonical configuration lives in `cubicle-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file)
//! yields a playable engine.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid environment override {name}: {reason}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Simulation pacing and probabilities.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Collaborator call settings.
    #[serde(default)]
    pub narration: NarrationConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CUBICLE_HOST` overrides `server.host`
    /// - `CUBICLE_PORT` overrides `server.port`
    /// - `CUBICLE_SEED` overrides `simulation.seed`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("CUBICLE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CUBICLE_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Env {
                name: "CUBICLE_PORT",
                reason: format!("{e}"),
            })?;
        }
        if let Ok(seed) = std::env::var("CUBICLE_SEED") {
            self.simulation.seed = Some(seed.parse().map_err(|e| ConfigError::Env {
                name: "CUBICLE_SEED",
                reason: format!("{e}"),
            })?);
        }
        Ok(())
    }
}

/// Simulation pacing and probabilities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Fixed RNG seed. `None` seeds each session from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Week at which surviving players receive an ending.
    #[serde(default = "default_survival_week")]
    pub survival_week: u32,

    /// Maximum retained memory facts.
    #[serde(default = "default_memory_fact_limit")]
    pub memory_fact_limit: usize,

    /// Maximum retained chat messages.
    #[serde(default = "default_chat_history_limit")]
    pub chat_history_limit: usize,

    /// Weeks per quarter. Quarterly events fire on multiples of this.
    #[serde(default = "default_weeks_per_quarter")]
    pub weeks_per_quarter: u32,

    /// Weeks per year.
    #[serde(default = "default_weeks_per_year")]
    pub weeks_per_year: u32,

    /// A new R&D project spawns on multiples of this week count.
    #[serde(default = "default_spawn_interval_weeks")]
    pub spawn_interval_weeks: u32,

    /// Chance of a random flavor event per free-text action.
    #[serde(default = "default_random_event_chance")]
    pub random_event_chance: f64,

    /// Chance of a random flavor event right after onboarding.
    #[serde(default = "default_init_event_chance")]
    pub init_event_chance: f64,

    /// Chance that an NPC comments on a command.
    #[serde(default = "default_command_reply_chance")]
    pub command_reply_chance: f64,

    /// Global disruption probabilities.
    #[serde(default)]
    pub global_events: GlobalEventConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            survival_week: default_survival_week(),
            memory_fact_limit: default_memory_fact_limit(),
            chat_history_limit: default_chat_history_limit(),
            weeks_per_quarter: default_weeks_per_quarter(),
            weeks_per_year: default_weeks_per_year(),
            spawn_interval_weeks: default_spawn_interval_weeks(),
            random_event_chance: default_random_event_chance(),
            init_event_chance: default_init_event_chance(),
            command_reply_chance: default_command_reply_chance(),
            global_events: GlobalEventConfig::default(),
        }
    }
}

/// Global disruption probabilities.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlobalEventConfig {
    /// Base trigger chance per time advance.
    #[serde(default = "default_global_base")]
    pub base_probability: f64,

    /// Base chance used after a command instead of free text.
    #[serde(default = "default_global_command")]
    pub command_probability: f64,

    /// Added when mood is at or below 25.
    #[serde(default = "default_global_low_stat_bonus")]
    pub low_mood_bonus: f64,

    /// Added when energy is at or below 25.
    #[serde(default = "default_global_low_stat_bonus")]
    pub low_energy_bonus: f64,

    /// Added when the player's project risk is at or above 80.
    #[serde(default = "default_global_risk_bonus")]
    pub high_risk_bonus: f64,
}

impl Default for GlobalEventConfig {
    fn default() -> Self {
        Self {
            base_probability: default_global_base(),
            command_probability: default_global_command(),
            low_mood_bonus: default_global_low_stat_bonus(),
            low_energy_bonus: default_global_low_stat_bonus(),
            high_risk_bonus: default_global_risk_bonus(),
        }
    }
}

/// Collaborator call settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarrationConfig {
    /// Deadline for a dialogue call.
    #[serde(default = "default_narration_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for a review scoring call.
    #[serde(default = "default_review_timeout_ms")]
    pub review_timeout_ms: u64,

    /// Chat messages included as context.
    #[serde(default = "default_recent_messages")]
    pub recent_messages: usize,
}

impl NarrationConfig {
    /// Dialogue deadline as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Review deadline as a [`Duration`].
    pub const fn review_timeout(&self) -> Duration {
        Duration::from_millis(self.review_timeout_ms)
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_narration_timeout_ms(),
            review_timeout_ms: default_review_timeout_ms(),
            recent_messages: default_recent_messages(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_survival_week() -> u32 {
    52
}

const fn default_memory_fact_limit() -> usize {
    20
}

const fn default_chat_history_limit() -> usize {
    300
}

const fn default_weeks_per_quarter() -> u32 {
    12
}

const fn default_weeks_per_year() -> u32 {
    48
}

const fn default_spawn_interval_weeks() -> u32 {
    104
}

const fn default_random_event_chance() -> f64 {
    0.1
}

const fn default_init_event_chance() -> f64 {
    0.5
}

const fn default_command_reply_chance() -> f64 {
    0.1
}

const fn default_global_base() -> f64 {
    0.08
}

const fn default_global_command() -> f64 {
    0.05
}

const fn default_global_low_stat_bonus() -> f64 {
    0.12
}

const fn default_global_risk_bonus() -> f64 {
    0.1
}

const fn default_narration_timeout_ms() -> u64 {
    5000
}

const fn default_review_timeout_ms() -> u64 {
    8000
}

const fn default_recent_messages() -> usize {
    12
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = EngineConfig::parse("").ok();
        assert_eq!(config, Some(EngineConfig::default()));
    }

    #[test]
    fn partial_yaml_fills_missing_fields() {
        let yaml = "simulation:\n  seed: 7\n  survival_week: 60\nserver:\n  port: 9000\n";
        let config = EngineConfig::parse(yaml).unwrap_or_default();
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.survival_week, 60);
        assert_eq!(config.simulation.weeks_per_quarter, 12);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.narration.timeout_ms, 5000);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = EngineConfig::parse("simulation: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn workspace_sample_config_parses() {
        let yaml = include_str!("../../../cubicle-config.yaml");
        let config = EngineConfig::parse(yaml);
        assert!(config.is_ok(), "sample config must parse: {config:?}");
    }
}

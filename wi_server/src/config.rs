//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::{path::PathBuf, time::Duration};
use word_impostor::{
    RegistryConfig, SessionSettings,
    constants::{DEFAULT_RECENT_PAIR_WINDOW, MAX_PLAYERS, MIN_PLAYERS},
};

/// One day, matching the leaderboard's daily recompute.
const DEFAULT_REFRESH_SECS: u64 = 86_400;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Word bank JSON file; the built-in decks are used when unset
    pub deck_path: Option<PathBuf>,
    /// Registry configuration
    pub registry: RegistryConfig,
    /// Settings applied to every new session
    pub session_defaults: SessionSettings,
    /// Leaderboard refresh period in seconds
    pub refresh_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `deck_override` - Optional word bank path (from CLI args)
    /// * `refresh_override` - Optional refresh period in seconds (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        deck_override: Option<PathBuf>,
        refresh_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let deck_path =
            deck_override.or_else(|| std::env::var("WI_DECK_PATH").ok().map(PathBuf::from));

        let registry = RegistryConfig {
            recent_pair_window: parse_env_or("WI_RECENT_PAIRS", DEFAULT_RECENT_PAIR_WINDOW)?,
            ..Default::default()
        };

        let defaults = SessionSettings::default();
        let session_defaults = SessionSettings {
            deck_language: std::env::var("WI_LANGUAGE")
                .unwrap_or_else(|_| defaults.deck_language.clone()),
            deck_id: std::env::var("WI_DECK_ID").unwrap_or_else(|_| defaults.deck_id.clone()),
            min_players: parse_env_or("WI_MIN_PLAYERS", defaults.min_players)?,
            max_players: parse_env_or("WI_MAX_PLAYERS", defaults.max_players)?,
            ..defaults
        };

        let refresh_secs = match refresh_override {
            Some(secs) => secs,
            None => parse_env_or("WI_REFRESH_SECS", DEFAULT_REFRESH_SECS)?,
        };

        Ok(ServerConfig {
            deck_path,
            registry,
            session_defaults,
            refresh_secs,
        })
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_defaults.min_players < MIN_PLAYERS {
            return Err(ConfigError::Invalid {
                var: "WI_MIN_PLAYERS".to_string(),
                reason: format!("Must be at least {MIN_PLAYERS}"),
            });
        }

        if self.session_defaults.max_players > MAX_PLAYERS {
            return Err(ConfigError::Invalid {
                var: "WI_MAX_PLAYERS".to_string(),
                reason: format!("Must be at most {MAX_PLAYERS}"),
            });
        }

        if self.session_defaults.max_players < self.session_defaults.min_players {
            return Err(ConfigError::Invalid {
                var: "WI_MAX_PLAYERS".to_string(),
                reason: format!(
                    "Must be at least min players ({})",
                    self.session_defaults.min_players
                ),
            });
        }

        if self.refresh_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "WI_REFRESH_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse an environment variable, falling back to `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

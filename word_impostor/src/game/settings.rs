//! Per-session settings snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::constants::{
    DEFAULT_DECK_ID, DEFAULT_LANGUAGE, DEFAULT_MAX_PLAYERS, DEFAULT_MIN_PLAYERS, MAX_PLAYERS,
    MIN_PLAYERS,
};
use super::entities::PlayerId;

/// Who may abort a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortPolicy {
    Anyone,
    PlayersAndAdmins,
    AdminsOnly,
}

impl std::fmt::Display for AbortPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortPolicy::Anyone => write!(f, "anyone"),
            AbortPolicy::PlayersAndAdmins => write!(f, "players_and_admins"),
            AbortPolicy::AdminsOnly => write!(f, "admins_only"),
        }
    }
}

/// Immutable configuration captured when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Word bank language
    pub deck_language: String,

    /// Deck (theme) within the language
    pub deck_id: String,

    /// Minimum roster size to start (never below 3)
    pub min_players: usize,

    /// Maximum roster size
    pub max_players: usize,

    /// Games count towards tournament standings
    pub tournament_mode: bool,

    /// Ask the transport to pin the final result
    pub pin_results: bool,

    /// Suppress chatter from non-players while a game runs
    pub restrict_non_players: bool,

    /// Only messages prefixed with `!` count as clues
    pub exclamation_mode: bool,

    /// Abort authorization
    pub abort_policy: AbortPolicy,

    /// Chat administrators, as known to the settings store
    pub admins: HashSet<PlayerId>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            deck_language: DEFAULT_LANGUAGE.to_string(),
            deck_id: DEFAULT_DECK_ID.to_string(),
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            tournament_mode: false,
            pin_results: false,
            restrict_non_players: false,
            exclamation_mode: false,
            abort_policy: AbortPolicy::PlayersAndAdmins,
            admins: HashSet::new(),
        }
    }
}

impl SessionSettings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if self.min_players < MIN_PLAYERS {
            return Err(format!("Min players must be at least {MIN_PLAYERS}"));
        }

        if self.max_players < self.min_players {
            return Err("Max players must not be below min players".to_string());
        }

        if self.max_players > MAX_PLAYERS {
            return Err(format!("Max players must be at most {MAX_PLAYERS}"));
        }

        if self.deck_language.trim().is_empty() || self.deck_id.trim().is_empty() {
            return Err("Deck language and deck id must be set".to_string());
        }

        Ok(())
    }

    /// Whether `requester` may abort, given whether they are on the roster.
    pub fn may_abort(&self, requester: PlayerId, is_player: bool) -> bool {
        let is_admin = self.admins.contains(&requester);
        match self.abort_policy {
            AbortPolicy::Anyone => true,
            AbortPolicy::PlayersAndAdmins => is_player || is_admin,
            AbortPolicy::AdminsOnly => is_admin,
        }
    }

    pub fn roster_bounds(&self) -> (usize, usize) {
        (self.min_players, self.max_players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(SessionSettings::default().validate().is_ok());
    }

    #[test]
    fn test_min_players_floor() {
        let settings = SessionSettings {
            min_players: 2,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_max_below_min_rejected() {
        let settings = SessionSettings {
            min_players: 5,
            max_players: 4,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_abort_policy() {
        let mut settings = SessionSettings::default();
        settings.admins.insert(99);

        assert!(settings.may_abort(1, true));
        assert!(settings.may_abort(99, false));
        assert!(!settings.may_abort(2, false));

        settings.abort_policy = AbortPolicy::AdminsOnly;
        assert!(!settings.may_abort(1, true));
        assert!(settings.may_abort(99, false));

        settings.abort_policy = AbortPolicy::Anyone;
        assert!(settings.may_abort(2, false));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: SessionSettings =
            serde_json::from_str(r#"{"max_players": 6, "exclamation_mode": true}"#).unwrap();
        assert_eq!(settings.max_players, 6);
        assert!(settings.exclamation_mode);
        assert_eq!(settings.min_players, DEFAULT_MIN_PLAYERS);
    }
}

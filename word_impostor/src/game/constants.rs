//! Engine-wide constants and defaults.

/// Smallest roster that can play a meaningful game (one impostor, two defenders).
pub const MIN_PLAYERS: usize = 3;

/// Hard ceiling on roster size, independent of per-chat settings.
pub const MAX_PLAYERS: usize = 20;

pub const DEFAULT_MIN_PLAYERS: usize = 3;
pub const DEFAULT_MAX_PLAYERS: usize = 10;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_DECK_ID: &str = "classic";

/// Number of recently used pairs excluded from selection per chat.
pub const DEFAULT_RECENT_PAIR_WINDOW: usize = 5;

/// Clues and display names longer than this are truncated.
pub const MAX_USER_INPUT_LENGTH: usize = 200;

/// Prefix a clue must carry when exclamation mode is enabled.
pub const EXCLAMATION_PREFIX: char = '!';

pub const DEFENDER_WIN_BONUS: i32 = 1;
pub const IMPOSTOR_WIN_BONUS: i32 = 3;
pub const CORRECT_ELIMINATION_BONUS: i32 = 1;

//! Read-only catalog of word pairs keyed by language and deck.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashSet;
//! use word_impostor::deck::WordBank;
//!
//! let bank = WordBank::builtin();
//! let pair = bank.select_pair("en", "classic", &HashSet::new()).unwrap();
//! assert_ne!(pair.common, pair.impostor);
//! ```

pub mod word_bank;

pub use word_bank::{DeckError, WordBank};

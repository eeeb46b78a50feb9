use rand::{Rng, seq::IndexedRandom};
use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};
use thiserror::Error;

use crate::game::entities::{PairId, WordPair};

/// Word bank errors
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("no deck '{deck_id}' for language '{language}'")]
    UnknownDeck { language: String, deck_id: String },

    #[error("every pair in the deck has been used recently")]
    NoEligiblePairs,

    #[error("invalid pair: {0}")]
    InvalidPair(String),

    #[error("failed to read deck file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse deck file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk layout: language -> deck id -> list of `[common, impostor]`.
type DeckFile = BTreeMap<String, BTreeMap<String, Vec<(String, String)>>>;

const BUILTIN: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "en",
        "classic",
        &[
            ("cat", "dog"),
            ("coffee", "tea"),
            ("beach", "desert"),
            ("guitar", "violin"),
            ("train", "bus"),
            ("winter", "autumn"),
            ("pizza", "burger"),
            ("doctor", "nurse"),
            ("moon", "sun"),
            ("castle", "palace"),
            ("river", "lake"),
            ("pencil", "crayon"),
        ],
    ),
    (
        "en",
        "food",
        &[
            ("apple", "pear"),
            ("butter", "cheese"),
            ("noodles", "rice"),
            ("lemon", "lime"),
            ("honey", "syrup"),
            ("bread", "cake"),
        ],
    ),
    (
        "de",
        "klassisch",
        &[
            ("Hund", "Katze"),
            ("Zug", "Bus"),
            ("Berg", "Hügel"),
            ("Kaffee", "Tee"),
            ("Sommer", "Frühling"),
            ("Schloss", "Burg"),
        ],
    ),
];

#[derive(Debug, Clone, Default)]
pub struct WordBank {
    decks: BTreeMap<(String, String), Vec<WordPair>>,
}

impl WordBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small bundled catalog, enough to play without a deck file.
    pub fn builtin() -> Self {
        let mut bank = Self::new();
        for (language, deck_id, pairs) in BUILTIN {
            for (common, impostor) in *pairs {
                if let Err(e) = bank.add_pair(language, deck_id, common, impostor) {
                    log::warn!("Skipping built-in pair in {language}/{deck_id}: {e}");
                }
            }
        }
        bank
    }

    pub fn from_json(json: &str) -> Result<Self, DeckError> {
        let file: DeckFile = serde_json::from_str(json)?;
        let mut bank = Self::new();
        for (language, decks) in file {
            for (deck_id, pairs) in decks {
                for (common, impostor) in pairs {
                    bank.add_pair(&language, &deck_id, &common, &impostor)?;
                }
            }
        }
        Ok(bank)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn add_pair(
        &mut self,
        language: &str,
        deck_id: &str,
        common: &str,
        impostor: &str,
    ) -> Result<PairId, DeckError> {
        let (common, impostor) = (common.trim(), impostor.trim());
        if common.is_empty() || impostor.is_empty() {
            return Err(DeckError::InvalidPair("words must not be empty".to_string()));
        }
        if common == impostor {
            return Err(DeckError::InvalidPair(format!(
                "'{common}' is used for both words"
            )));
        }

        let pairs = self
            .decks
            .entry((language.to_string(), deck_id.to_string()))
            .or_default();
        let id = format!("{language}/{deck_id}/{}", pairs.len());
        pairs.push(WordPair {
            id: id.clone(),
            language: language.to_string(),
            deck_id: deck_id.to_string(),
            common: common.to_string(),
            impostor: impostor.to_string(),
        });
        Ok(id)
    }

    pub fn has_deck(&self, language: &str, deck_id: &str) -> bool {
        self.decks
            .contains_key(&(language.to_string(), deck_id.to_string()))
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.decks.keys().map(|(l, _)| l.as_str()).collect();
        languages.dedup();
        languages
    }

    pub fn decks(&self, language: &str) -> Vec<&str> {
        self.decks
            .keys()
            .filter(|(l, _)| l == language)
            .map(|(_, d)| d.as_str())
            .collect()
    }

    pub fn deck_len(&self, language: &str, deck_id: &str) -> usize {
        self.decks
            .get(&(language.to_string(), deck_id.to_string()))
            .map_or(0, Vec::len)
    }

    /// Uniformly random pair from the deck, skipping ids in `exclude`.
    pub fn select_pair(
        &self,
        language: &str,
        deck_id: &str,
        exclude: &HashSet<PairId>,
    ) -> Result<WordPair, DeckError> {
        self.select_pair_with(language, deck_id, exclude, &mut rand::rng())
    }

    pub fn select_pair_with<R: Rng + ?Sized>(
        &self,
        language: &str,
        deck_id: &str,
        exclude: &HashSet<PairId>,
        rng: &mut R,
    ) -> Result<WordPair, DeckError> {
        let pairs = self
            .decks
            .get(&(language.to_string(), deck_id.to_string()))
            .ok_or_else(|| DeckError::UnknownDeck {
                language: language.to_string(),
                deck_id: deck_id.to_string(),
            })?;

        let eligible: Vec<&WordPair> = pairs.iter().filter(|p| !exclude.contains(&p.id)).collect();
        eligible
            .choose(rng)
            .map(|p| (*p).clone())
            .ok_or(DeckError::NoEligiblePairs)
    }
}

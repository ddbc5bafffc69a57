// src/core/types.rs
use serde::{Deserialize, Serialize};

/// Dense identifier of a normalized term inside the fuzzy index.
pub type WordId = usize;

/// Highest raw frequency a dictionary asset can carry.
pub const MAX_RAW_FREQUENCY: u8 = 255;
/// Ceiling of the rescaled frequency used for ranking.
pub const EFFECTIVE_FREQUENCY_MAX: u32 = 1600;
const FREQUENCY_EXPONENT: f64 = 0.75;

/// Provenance of a dictionary entry. USER entries always outrank MAIN ones
/// in the final suggestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Main,
    User,
}

/// A single word known to the engine.
/// Replaced wholesale on re-index, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    /// Raw 0..=255 frequency byte from the asset or the user store.
    pub frequency: u8,
    pub source: Source,
}

impl DictionaryEntry {
    pub fn new(word: impl Into<String>, frequency: u8, source: Source) -> Self {
        Self {
            word: word.into(),
            frequency,
            source,
        }
    }

    pub fn main(word: impl Into<String>, frequency: u8) -> Self {
        Self::new(word, frequency, Source::Main)
    }

    pub fn user(word: impl Into<String>, frequency: u8) -> Self {
        Self::new(word, frequency, Source::User)
    }

    pub fn effective_frequency(&self) -> u32 {
        effective_frequency(self.frequency)
    }

    /// Same word (ignoring case) from the same source.
    pub(crate) fn same_slot(&self, other: &DictionaryEntry) -> bool {
        self.source == other.source && self.word.to_lowercase() == other.word.to_lowercase()
    }
}

/// Maps a raw frequency through `round(1600 * (raw/255)^0.75)`, floored at 1.
/// Rare words keep a non-zero weight while common words dominate sub-linearly.
pub fn effective_frequency(raw: u8) -> u32 {
    let normalized = f64::from(raw) / f64::from(MAX_RAW_FREQUENCY);
    let scaled = (normalized.powf(FREQUENCY_EXPONENT) * f64::from(EFFECTIVE_FREQUENCY_MAX)).round();
    (scaled as u32).max(1)
}

/// One ranked suggestion. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionCandidate {
    pub candidate: String,
    pub edit_distance: usize,
    pub score: f64,
    pub source: Source,
}

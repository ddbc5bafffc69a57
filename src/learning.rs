// File: src/learning.rs
use crate::core::types::MAX_RAW_FREQUENCY;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw frequency a freshly learned word starts with.
pub const NEW_WORD_FREQUENCY: u8 = 1;

/// A word in the user dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub word: String,
    pub frequency: u8,
}

/// Persistent word -> frequency store backing the USER source.
///
/// Words are matched case-insensitively; the stored spelling is the one
/// first added.
pub trait UserDictionaryStore: Send + Sync {
    fn entries(&self) -> Vec<UserEntry>;

    /// Adds `word`, or bumps it if already present. Returns the stored entry,
    /// or `None` for a blank word.
    fn add_word(&self, word: &str) -> Option<UserEntry>;

    fn remove_word(&self, word: &str) -> bool;

    /// Bumps a word that is already in the store. Unknown words are ignored.
    fn mark_used(&self, word: &str) -> Option<UserEntry>;

    fn get(&self, word: &str) -> Option<UserEntry> {
        let key = word.trim().to_lowercase();
        self.entries().into_iter().find(|e| e.word.to_lowercase() == key)
    }
}

/// Frequency bookkeeping shared by every user dictionary implementation.
#[derive(Debug, Clone, Copy)]
pub struct LearningEngine {
    frequency_increment: u8,
}

impl LearningEngine {
    pub fn new() -> Self {
        Self { frequency_increment: 1 }
    }

    pub fn with_increment(frequency_increment: u8) -> Self {
        Self { frequency_increment }
    }

    /// Saturates at the top of the raw frequency range.
    pub fn bump(&self, frequency: u8) -> u8 {
        frequency.saturating_add(self.frequency_increment).min(MAX_RAW_FREQUENCY)
    }

    /// Records a use of `word` in `words` (keyed by lowercase spelling).
    /// With `create`, unknown words are inserted at [`NEW_WORD_FREQUENCY`].
    pub fn learn(&self, words: &mut BTreeMap<String, UserEntry>, word: &str, create: bool) -> Option<UserEntry> {
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        let key = word.to_lowercase();
        match words.get_mut(&key) {
            Some(entry) => {
                entry.frequency = self.bump(entry.frequency);
                Some(entry.clone())
            }
            None if create => {
                let entry = UserEntry {
                    word: word.to_string(),
                    frequency: NEW_WORD_FREQUENCY,
                };
                words.insert(key, entry.clone());
                Some(entry)
            }
            None => None,
        }
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process user dictionary, used by tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryUserDictionary {
    words: Mutex<BTreeMap<String, UserEntry>>,
    learning_engine: LearningEngine,
}

impl MemoryUserDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with fixed frequencies.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let words = entries
            .into_iter()
            .map(|(word, frequency)| {
                let word = word.into();
                (word.to_lowercase(), UserEntry { word, frequency })
            })
            .collect();
        Self {
            words: Mutex::new(words),
            learning_engine: LearningEngine::new(),
        }
    }
}

impl UserDictionaryStore for MemoryUserDictionary {
    fn entries(&self) -> Vec<UserEntry> {
        self.words.lock().values().cloned().collect()
    }

    fn add_word(&self, word: &str) -> Option<UserEntry> {
        self.learning_engine.learn(&mut self.words.lock(), word, true)
    }

    fn remove_word(&self, word: &str) -> bool {
        self.words.lock().remove(&word.trim().to_lowercase()).is_some()
    }

    fn mark_used(&self, word: &str) -> Option<UserEntry> {
        self.learning_engine.learn(&mut self.words.lock(), word, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_bump() {
        let store = MemoryUserDictionary::new();
        assert_eq!(store.add_word("Pastiera").map(|e| e.frequency), Some(1));
        assert_eq!(store.add_word("pastiera").map(|e| e.frequency), Some(2));
        assert_eq!(store.get("PASTIERA").map(|e| e.word), Some("Pastiera".to_string()));
        assert!(store.add_word("   ").is_none());
    }

    #[test]
    fn mark_used_only_touches_known_words() {
        let store = MemoryUserDictionary::with_entries([("ciao", 254u8)]);
        assert!(store.mark_used("nope").is_none());
        assert!(store.entries().iter().all(|e| e.word != "nope"));
        assert_eq!(store.mark_used("ciao").map(|e| e.frequency), Some(255));
        assert_eq!(store.mark_used("ciao").map(|e| e.frequency), Some(255));
    }

    #[test]
    fn remove_is_case_insensitive() {
        let store = MemoryUserDictionary::with_entries([("Roma", 9u8)]);
        assert!(store.remove_word("roma"));
        assert!(!store.remove_word("roma"));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn custom_increment() {
        let engine = LearningEngine::with_increment(10);
        assert_eq!(engine.bump(250), 255);
        assert_eq!(engine.bump(5), 15);
    }
}

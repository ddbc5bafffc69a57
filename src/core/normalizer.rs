// File: src/core/normalizer.rs
use crate::core::casing::CaseLocale;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// The one apostrophe the engine reasons about.
pub const APOSTROPHE: char = '\'';

const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Maps typographic apostrophe glyphs to the plain ASCII one.
pub fn canonical_apostrophe(c: char) -> char {
    match c {
        '\u{2019}' | '\u{2018}' | '\u{02BC}' => APOSTROPHE,
        _ => c,
    }
}

pub fn canonical_apostrophes(s: &str) -> String {
    s.chars().map(canonical_apostrophe).collect()
}

/// Uncached index key with the default locale.
pub fn normalize(word: &str) -> String {
    fold(word, CaseLocale::Root, false)
}

/// NFD-decomposes and drops combining marks: `perché` -> `perche`.
pub fn strip_accents_uncached(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn fold(word: &str, locale: CaseLocale, keep_apostrophe: bool) -> String {
    let apostrophes = canonical_apostrophes(word);
    let lowered = locale.lowercase(&apostrophes);
    strip_accents_uncached(&lowered)
        .chars()
        .filter(|c| c.is_alphabetic() || (keep_apostrophe && *c == APOSTROPHE))
        .collect()
}

/// Produces the keys every component compares words by.
///
/// `key` is the index key: canonical apostrophes, lowercase, accents
/// stripped, letters only. `apostrophe_key` is the same but keeps
/// apostrophes, which the ranker needs for elisions such as `l'acqua`.
/// Results are memoized per raw input.
pub struct Normalizer {
    locale: CaseLocale,
    keys: Mutex<LruCache<String, String>>,
    apostrophe_keys: Mutex<LruCache<String, String>>,
    accents: Mutex<LruCache<String, String>>,
}

impl Normalizer {
    pub fn new(locale: CaseLocale) -> Self {
        Self::with_capacity(locale, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(locale: CaseLocale, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            locale,
            keys: Mutex::new(LruCache::new(cap)),
            apostrophe_keys: Mutex::new(LruCache::new(cap)),
            accents: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn locale(&self) -> CaseLocale {
        self.locale
    }

    pub fn key(&self, word: &str) -> String {
        memoized(&self.keys, word, |w| fold(w, self.locale, false))
    }

    pub fn apostrophe_key(&self, word: &str) -> String {
        memoized(&self.apostrophe_keys, word, |w| fold(w, self.locale, true))
    }

    pub fn strip_accents(&self, s: &str) -> String {
        memoized(&self.accents, s, strip_accents_uncached)
    }

    pub fn lowercase(&self, s: &str) -> String {
        self.locale.lowercase(s)
    }
}

fn memoized(cache: &Mutex<LruCache<String, String>>, input: &str, f: impl FnOnce(&str) -> String) -> String {
    if let Some(hit) = cache.lock().get(input) {
        return hit.clone();
    }
    let value = f(input);
    cache.lock().put(input.to_string(), value.clone());
    value
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CaseLocale::Root)
    }
}

// Caches are not carried over: a clone starts cold.
impl Clone for Normalizer {
    fn clone(&self) -> Self {
        Self::new(self.locale)
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer").field("locale", &self.locale).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    const ALPHABET: &[char] = &[
        'a', 'B', 'c', 'é', 'È', 'ò', 'Ü', 'ß', 'ñ', '\'', '\u{2019}', ' ', '1', '-', 'z', 'Ç',
    ];

    #[test]
    fn strips_accents_and_case() {
        let n = Normalizer::default();
        assert_eq!(n.key("Perché"), "perche");
        assert_eq!(n.key("perché"), n.key("perche"));
        assert_eq!(n.key("Città!"), "citta");
    }

    #[test]
    fn index_key_drops_apostrophes_and_digits() {
        let n = Normalizer::default();
        assert_eq!(n.key("l’acqua"), "lacqua");
        assert_eq!(n.key("abc123"), "abc");
        assert_eq!(n.apostrophe_key("L’Acqua"), "l'acqua");
    }

    #[test]
    fn strip_accents_only_touches_marks() {
        let n = Normalizer::default();
        assert_eq!(n.strip_accents("perché"), "perche");
        assert_eq!(n.strip_accents("á"), "a");
        assert_eq!(n.strip_accents("Hallo!"), "Hallo!");
    }

    #[test]
    fn cache_returns_same_result() {
        let n = Normalizer::with_capacity(CaseLocale::Root, 1);
        assert_eq!(n.key("Perché"), "perche");
        assert_eq!(n.key("Perché"), "perche");
        assert_eq!(n.key("Ciao"), "ciao");
        assert_eq!(n.key("Perché"), "perche");
    }

    quickcheck! {
        fn normalize_is_idempotent(picks: Vec<u8>) -> bool {
            let word: String = picks.iter().map(|p| ALPHABET[*p as usize % ALPHABET.len()]).collect();
            let once = normalize(&word);
            normalize(&once) == once
        }
    }
}

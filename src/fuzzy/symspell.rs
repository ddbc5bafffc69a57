// File: src/fuzzy/symspell.rs
use crate::core::casing::CaseLocale;
use crate::core::normalizer::Normalizer;
use crate::core::types::WordId;
use crate::fuzzy::distance::bounded_osa_chars;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 2;
pub const DEFAULT_PREFIX_LENGTH: usize = 7;

/// One fuzzy match: the indexed term, its true edit distance to the query
/// and the frequency it was indexed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestItem {
    pub term: String,
    pub distance: usize,
    pub frequency: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Term {
    word: String,
    frequency: u32,
    active: bool,
}

/// Distribution format of a [`FuzzyIndex`]: term frequencies plus the
/// delete-variant map. A delete target that is not itself a term is read
/// as a prefix and stands for every term starting with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedIndex {
    pub max_edit_distance: usize,
    pub prefix_length: usize,
    pub terms: HashMap<String, u32>,
    pub deletes: HashMap<String, Vec<String>>,
}

/// Approximate string matching over normalized words, based on the
/// Symmetric Delete (SymSpell) algorithm.
///
/// Every indexed word is registered under the strings reachable by deleting
/// up to `max_edit_distance` chars from its first `prefix_length` chars.
/// A query generates its own deletes the same way; any shared variant makes
/// the word a candidate, and the true distance is then checked with a
/// bounded OSA pass over the full strings. Typos past the prefix are still
/// caught by that final check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyIndex {
    /// Maps a delete variant (e.g. "hllo") to the ids of the terms it came from.
    deletes: HashMap<String, HashSet<WordId>>,
    terms: Vec<Term>,
    ids: HashMap<String, WordId>,
    max_edit_distance: usize,
    prefix_length: usize,
    #[serde(skip)]
    normalizer: Normalizer,
}

impl FuzzyIndex {
    pub fn new(max_edit_distance: usize, prefix_length: usize) -> Self {
        Self {
            deletes: HashMap::new(),
            terms: Vec::new(),
            ids: HashMap::new(),
            max_edit_distance,
            prefix_length: prefix_length.max(1),
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_locale(mut self, locale: CaseLocale) -> Self {
        self.normalizer = Normalizer::new(locale);
        self
    }

    pub fn max_edit_distance(&self) -> usize {
        self.max_edit_distance
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    /// Number of active terms.
    pub fn len(&self) -> usize {
        self.terms.iter().filter(|t| t.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frequency(&self, word: &str) -> Option<u32> {
        let key = self.normalizer.key(word);
        self.ids
            .get(&key)
            .map(|&id| &self.terms[id])
            .filter(|t| t.active)
            .map(|t| t.frequency)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.frequency(word).is_some()
    }

    /// Adds (or re-weights) a word. Re-adding an existing word only updates
    /// its frequency.
    pub fn add_word(&mut self, word: &str, frequency: u32) {
        let key = self.normalizer.key(word);
        if key.is_empty() {
            return;
        }
        let word_id = match self.ids.get(&key) {
            Some(&id) => {
                let term = &mut self.terms[id];
                term.frequency = frequency;
                if term.active {
                    return;
                }
                term.active = true;
                id
            }
            None => {
                let id = self.terms.len();
                self.terms.push(Term {
                    word: key.clone(),
                    frequency,
                    active: true,
                });
                self.ids.insert(key.clone(), id);
                id
            }
        };
        self.register(&key, word_id);
    }

    /// Deactivates a word and drops it from every delete bucket.
    /// Returns false when the word was not indexed.
    pub fn remove_word(&mut self, word: &str) -> bool {
        let key = self.normalizer.key(word);
        let Some(&word_id) = self.ids.get(&key) else {
            return false;
        };
        if !self.terms[word_id].active {
            return false;
        }
        self.terms[word_id].active = false;

        let mut variants = self.generate_edits(self.prefix_of(&key));
        variants.insert(key);
        for variant in variants {
            if let Some(bucket) = self.deletes.get_mut(&variant) {
                bucket.remove(&word_id);
                if bucket.is_empty() {
                    self.deletes.remove(&variant);
                }
            }
        }
        true
    }

    /// Finds indexed terms within `max_edit_distance` of `term`, ranked by
    /// (distance asc, frequency desc) and truncated to `max_suggestions`.
    /// Empty or letter-free input yields nothing.
    pub fn lookup(&self, term: &str, max_suggestions: usize) -> Vec<SuggestItem> {
        let input = self.normalizer.key(term);
        if input.is_empty() || max_suggestions == 0 {
            return Vec::new();
        }

        let mut candidates: HashSet<WordId> = HashSet::new();

        // The full key catches exact hits on words longer than the prefix.
        if let Some(word_ids) = self.deletes.get(&input) {
            candidates.extend(word_ids.iter().copied());
        }
        for edit in self.generate_edits(self.prefix_of(&input)) {
            if let Some(word_ids) = self.deletes.get(&edit) {
                candidates.extend(word_ids.iter().copied());
            }
        }

        let input_chars: Vec<char> = input.chars().collect();
        let mut results: Vec<SuggestItem> = candidates
            .into_iter()
            .filter_map(|id| self.terms.get(id))
            .filter(|t| t.active)
            .filter_map(|t| {
                let chars: Vec<char> = t.word.chars().collect();
                let distance = bounded_osa_chars(&input_chars, &chars, self.max_edit_distance)?;
                Some(SuggestItem {
                    term: t.word.clone(),
                    distance,
                    frequency: t.frequency,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            (a.distance, Reverse(a.frequency), &a.term).cmp(&(b.distance, Reverse(b.frequency), &b.term))
        });
        results.truncate(max_suggestions);
        results
    }

    /// Exports active terms and their delete buckets.
    pub fn to_serialized(&self) -> SerializedIndex {
        let terms = self
            .terms
            .iter()
            .filter(|t| t.active)
            .map(|t| (t.word.clone(), t.frequency))
            .collect();
        let deletes = self
            .deletes
            .iter()
            .map(|(variant, ids)| {
                let words: BTreeSet<String> = ids
                    .iter()
                    .filter_map(|&id| self.terms.get(id))
                    .filter(|t| t.active)
                    .map(|t| t.word.clone())
                    .collect();
                (variant.clone(), words.into_iter().collect::<Vec<_>>())
            })
            .filter(|(_, words)| !words.is_empty())
            .collect();
        SerializedIndex {
            max_edit_distance: self.max_edit_distance,
            prefix_length: self.prefix_length,
            terms,
            deletes,
        }
    }

    pub fn from_serialized(serialized: &SerializedIndex) -> Self {
        let mut index = Self::new(serialized.max_edit_distance, serialized.prefix_length);
        index.load_serialized(&serialized.terms, &serialized.deletes);
        index
    }

    /// Replaces the whole index with precomputed data. Prefix references in
    /// `deletes` are expanded to the terms they cover; unknown targets are
    /// dropped.
    pub fn load_serialized(&mut self, terms: &HashMap<String, u32>, deletes: &HashMap<String, Vec<String>>) {
        self.deletes.clear();
        self.terms.clear();
        self.ids.clear();

        let mut sorted: Vec<(&String, &u32)> = terms.iter().filter(|(w, _)| !w.is_empty()).collect();
        sorted.sort();
        let mut by_prefix: HashMap<String, Vec<WordId>> = HashMap::new();
        for (word, &frequency) in sorted {
            let id = self.terms.len();
            self.terms.push(Term {
                word: word.clone(),
                frequency,
                active: true,
            });
            self.ids.insert(word.clone(), id);
            by_prefix.entry(self.prefix_of(word).to_string()).or_default().push(id);
            self.deletes.entry(word.clone()).or_default().insert(id);
        }

        for (variant, targets) in deletes {
            let mut expanded: HashSet<WordId> = HashSet::new();
            for target in targets {
                match self.ids.get(target) {
                    Some(&id) => {
                        expanded.insert(id);
                    }
                    None => {
                        if let Some(ids) = by_prefix.get(target) {
                            expanded.extend(ids.iter().copied());
                        }
                    }
                }
            }
            if !expanded.is_empty() {
                self.deletes.entry(variant.clone()).or_default().extend(expanded);
            }
        }
    }

    fn register(&mut self, key: &str, word_id: WordId) {
        self.deletes.entry(key.to_string()).or_default().insert(word_id);
        for edit in self.generate_edits(self.prefix_of(key)) {
            self.deletes.entry(edit).or_default().insert(word_id);
        }
    }

    fn prefix_of<'a>(&self, word: &'a str) -> &'a str {
        match word.char_indices().nth(self.prefix_length) {
            Some((idx, _)) => &word[..idx],
            None => word,
        }
    }

    /// Generates all unique variants within max_edit_distance deletions,
    /// including the original string itself.
    fn generate_edits(&self, word: &str) -> HashSet<String> {
        let mut edits = HashSet::new();
        edits.insert(word.to_string());

        let mut current_edits = edits.clone();

        for _ in 0..self.max_edit_distance {
            let mut next_edits = HashSet::new();
            for edit in current_edits {
                for (idx, ch) in edit.char_indices() {
                    let mut deleted_variant = String::with_capacity(edit.len());
                    deleted_variant.push_str(&edit[..idx]);
                    deleted_variant.push_str(&edit[idx + ch.len_utf8()..]);
                    if !edits.contains(&deleted_variant) {
                        next_edits.insert(deleted_variant);
                    }
                }
            }
            if next_edits.is_empty() {
                break;
            }
            edits.extend(next_edits.iter().cloned());
            current_edits = next_edits;
        }

        edits
    }
}

impl Default for FuzzyIndex {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_PREFIX_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::distance::bounded_osa;
    use quickcheck::{quickcheck, TestResult};

    fn has(results: &[SuggestItem], term: &str, distance: usize) -> bool {
        results.iter().any(|r| r.term == term && r.distance == distance)
    }

    #[test]
    fn exact_match() {
        let mut index = FuzzyIndex::default();
        index.add_word("hallo", 100);
        let results = index.lookup("hallo", 5);
        assert_eq!(
            results,
            vec![SuggestItem {
                term: "hallo".into(),
                distance: 0,
                frequency: 100
            }]
        );
    }

    #[test]
    fn single_edits() {
        let mut index = FuzzyIndex::default();
        index.add_word("hallo", 100);
        assert!(has(&index.lookup("hxllo", 5), "hallo", 1));
        assert!(has(&index.lookup("hllo", 5), "hallo", 1));
        assert!(has(&index.lookup("haallo", 5), "hallo", 1));
        assert!(has(&index.lookup("halol", 5), "hallo", 1));
    }

    #[test]
    fn ranks_by_frequency_within_distance() {
        let mut index = FuzzyIndex::default();
        index.add_word("hallo", 10);
        index.add_word("halle", 100);
        let results = index.lookup("hallx", 5);
        let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, ["halle", "hallo"]);
    }

    #[test]
    fn long_words_use_prefix() {
        let mut index = FuzzyIndex::new(2, 7);
        index.add_word("donaudampfschiff", 100);
        assert!(has(&index.lookup("donaudampfschixf", 5), "donaudampfschiff", 1));
        assert!(has(&index.lookup("donaxdampfschiff", 5), "donaudampfschiff", 1));
        assert!(has(&index.lookup("donaudampfschiff", 5), "donaudampfschiff", 0));
    }

    #[test]
    fn respects_max_distance() {
        let mut index = FuzzyIndex::new(2, 7);
        index.add_word("hallo", 100);
        assert!(has(&index.lookup("hxxlo", 5), "hallo", 2));
        assert!(index.lookup("hxxxo", 5).iter().all(|r| r.term != "hallo"));
    }

    #[test]
    fn short_words_reach_single_letter_queries() {
        let mut index = FuzzyIndex::new(2, 7);
        index.add_word("io", 100);
        index.add_word("il", 100);
        let results = index.lookup("i", 5);
        assert!(has(&results, "io", 1));
        assert!(has(&results, "il", 1));
    }

    #[test]
    fn empty_input_is_empty() {
        let mut index = FuzzyIndex::default();
        index.add_word("hallo", 100);
        assert!(index.lookup("", 5).is_empty());
        assert!(index.lookup("123!", 5).is_empty());
    }

    #[test]
    fn lookup_normalizes_query() {
        let mut index = FuzzyIndex::default();
        index.add_word("perché", 50);
        assert!(has(&index.lookup("Perche", 5), "perche", 0));
    }

    #[test]
    fn remove_word_drops_it() {
        let mut index = FuzzyIndex::default();
        index.add_word("hallo", 100);
        index.add_word("halle", 10);
        assert!(index.remove_word("hallo"));
        assert!(!index.remove_word("hallo"));
        assert!(index.lookup("hallx", 5).iter().all(|r| r.term != "hallo"));
        assert_eq!(index.len(), 1);

        index.add_word("hallo", 7);
        assert!(has(&index.lookup("hallo", 5), "hallo", 0));
        assert_eq!(index.frequency("hallo"), Some(7));
    }

    #[test]
    fn loads_precomputed_deletes() {
        let mut index = FuzzyIndex::new(2, 7);
        let terms: HashMap<String, u32> = [("apfel".to_string(), 50), ("birne".to_string(), 40)].into();
        let deletes: HashMap<String, Vec<String>> = [
            ("apfel", vec!["apfel"]),
            ("apfe", vec!["apfel"]),
            ("apfl", vec!["apfel"]),
            ("birne", vec!["birne"]),
            ("birn", vec!["birne"]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
        .collect();
        index.load_serialized(&terms, &deletes);

        let exact = index.lookup("apfel", 5);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].term, "apfel");
        assert!(index.lookup("apfl", 5).iter().any(|r| r.term == "apfel"));
        assert!(index.lookup("birne", 5).iter().any(|r| r.term == "birne"));
    }

    #[test]
    fn prefix_references_expand_to_terms() {
        let mut index = FuzzyIndex::new(2, 3);
        let terms: HashMap<String, u32> = [("casa".to_string(), 9), ("casale".to_string(), 3)].into();
        let deletes: HashMap<String, Vec<String>> = [("cs".to_string(), vec!["cas".to_string()])].into();
        index.load_serialized(&terms, &deletes);
        let results = index.lookup("csa", 5);
        assert!(has(&results, "casa", 1));
    }

    #[test]
    fn serialized_round_trip_matches_incremental() {
        let mut built = FuzzyIndex::new(2, 7);
        for (word, freq) in [("hallo", 100), ("halle", 40), ("hello", 70), ("donaudampfschiff", 5), ("io", 9)] {
            built.add_word(word, freq);
        }
        built.remove_word("hello");
        let loaded = FuzzyIndex::from_serialized(&built.to_serialized());
        for query in ["hallo", "hxllo", "hallx", "hello", "donaxdampfschiff", "i", "zzz"] {
            assert_eq!(built.lookup(query, 10), loaded.lookup(query, 10), "query {query}");
        }
    }

    const LETTERS: [char; 3] = ['a', 'b', 'c'];

    fn word_from(picks: &[u8]) -> String {
        picks.iter().take(10).map(|p| LETTERS[*p as usize % LETTERS.len()]).collect()
    }

    quickcheck! {
        fn indexed_words_always_match_exactly(picks: Vec<u8>) -> TestResult {
            let word = word_from(&picks);
            if word.is_empty() {
                return TestResult::discard();
            }
            let mut index = FuzzyIndex::default();
            index.add_word(&word, 1);
            TestResult::from_bool(has(&index.lookup(&word, 50), &word, 0))
        }

        fn lookup_is_bounded_and_complete(query: Vec<u8>, indexed: Vec<u8>) -> TestResult {
            let a = word_from(&query);
            let b = word_from(&indexed);
            if a.is_empty() || b.is_empty() {
                return TestResult::discard();
            }
            // Short prefix so longer words exercise the truncated deletes.
            let mut index = FuzzyIndex::new(2, 3);
            index.add_word(&b, 1);
            let results = index.lookup(&a, 50);
            let ok = match bounded_osa(&a, &b, 2) {
                Some(d) => has(&results, &b, d),
                None => results.iter().all(|r| r.term != b),
            };
            TestResult::from_bool(ok)
        }
    }
}

// File: src/core/ranker.rs
use crate::config::SuggestionSettings;
use crate::core::casing::CaseLocale;
use crate::core::dictionary::DictionaryStore;
use crate::core::keyboard::{KeyPositions, KeyboardLayout, ADJACENT_KEY_DISTANCE, NEARBY_KEY_DISTANCE};
use crate::core::normalizer::{canonical_apostrophes, APOSTROPHE};
use crate::core::types::{DictionaryEntry, Source, SuggestionCandidate, EFFECTIVE_FREQUENCY_MAX};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

const ACCENT_CHARS: [char; 14] = ['à', 'è', 'é', 'ì', 'ò', 'ó', 'ù', 'À', 'È', 'É', 'Ì', 'Ò', 'Ó', 'Ù'];
const USER_SOURCE_BOOST: f64 = 5.0;
const MAX_APOSTROPHE_PREFIX: usize = 3;
const MIN_APOSTROPHE_ROOT: usize = 3;

/// Query knobs, usually taken from [`SuggestionSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestOptions {
    pub limit: usize,
    pub accent_matching: bool,
    pub keyboard_proximity: bool,
    pub edit_type_ranking: bool,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            limit: 3,
            accent_matching: true,
            keyboard_proximity: true,
            edit_type_ranking: true,
        }
    }
}

impl From<&SuggestionSettings> for SuggestOptions {
    fn from(settings: &SuggestionSettings) -> Self {
        Self {
            limit: settings.max_suggestions,
            accent_matching: settings.accent_matching,
            keyboard_proximity: settings.keyboard_proximity,
            edit_type_ranking: settings.edit_type_ranking,
        }
    }
}

/// `l'amico` -> prefix `l'`, root `amico`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApostropheSplit {
    pub prefix: String,
    pub root: String,
}

/// Splits a word with exactly one inner apostrophe into a 1-3 letter prefix
/// (apostrophe included) and a root of at least 3 letters.
pub fn split_apostrophe_word(word: &str) -> Option<ApostropheSplit> {
    let normalized = canonical_apostrophes(word);
    if normalized.chars().filter(|c| *c == APOSTROPHE).count() != 1 {
        return None;
    }
    let idx = normalized.find(APOSTROPHE)?;
    let prefix_raw = &normalized[..idx];
    let root = &normalized[idx + APOSTROPHE.len_utf8()..];

    let prefix_len = prefix_raw.chars().count();
    let prefix_ok = (1..=MAX_APOSTROPHE_PREFIX).contains(&prefix_len) && prefix_raw.chars().all(char::is_alphabetic);
    let root_ok = root.chars().count() >= MIN_APOSTROPHE_ROOT && root.chars().all(char::is_alphabetic);
    (prefix_ok && root_ok).then(|| ApostropheSplit {
        prefix: format!("{}{}", prefix_raw, APOSTROPHE),
        root: root.to_string(),
    })
}

/// Re-attaches the typed prefix to a root candidate. Candidates carrying a
/// different apostrophe prefix of their own are rejected.
pub fn recompose_apostrophe_candidate(split: &ApostropheSplit, candidate: &str, locale: CaseLocale) -> Option<String> {
    let normalized = canonical_apostrophes(candidate);
    let prefix_chars = split.prefix.chars().count();
    let head: String = normalized.chars().take(prefix_chars).collect();
    let matches_prefix = head.chars().count() == prefix_chars && locale.lowercase(&head) == locale.lowercase(&split.prefix);

    let root_part: String = if matches_prefix {
        normalized.chars().skip(prefix_chars).collect()
    } else if normalized.contains(APOSTROPHE) {
        return None;
    } else {
        normalized
    };
    let recased = locale.apply_casing(&root_part, &split.root, false);
    Some(format!("{}{}", split.prefix, recased))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditType {
    Delete,
    Substitute,
    Insert,
    Other,
}

fn edit_type(input: &[char], suggestion: &[char]) -> EditType {
    match (input.len(), suggestion.len()) {
        (i, s) if s + 1 == i => EditType::Delete,
        (i, s) if s == i => EditType::Substitute,
        (i, s) if s == i + 1 => EditType::Insert,
        _ => EditType::Other,
    }
}

fn has_adjacent_duplicates(word: &[char]) -> bool {
    word.windows(2).any(|w| w[0] == w[1])
}

/// The suggestion breaks up one of the doubled letters of the input.
fn fixes_duplicate_letter(input: &[char], suggestion: &[char]) -> bool {
    if input.len() != suggestion.len() {
        return false;
    }
    (0..input.len().saturating_sub(1))
        .any(|i| input[i] == input[i + 1] && i + 1 < suggestion.len() && suggestion[i] != suggestion[i + 1])
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Exactly two neighbouring positions swapped: `teh` <-> `the`.
fn is_transposition(input: &[char], suggestion: &[char]) -> bool {
    if input.len() != suggestion.len() {
        return false;
    }
    let diffs: Vec<usize> = (0..input.len()).filter(|&i| lower(input[i]) != lower(suggestion[i])).collect();
    match diffs.as_slice() {
        [a, b] if *b == a + 1 => lower(input[*a]) == lower(suggestion[*b]) && lower(input[*b]) == lower(suggestion[*a]),
        _ => false,
    }
}

/// Ranks candidates for the word being typed.
///
/// Candidates come from prefix completions, fuzzy matches and, for a
/// single typed letter, its accented forms and short elisions. Each one
/// gets an additive score (distance, frequency, prefix, edit type, accents,
/// length, symbols) multiplied by 5 for USER words. The final order is:
/// USER words, then prefix completions, then by distance, score and length.
pub struct SuggestionRanker {
    store: Arc<DictionaryStore>,
    keys: KeyPositions,
}

impl SuggestionRanker {
    pub fn new(store: Arc<DictionaryStore>, layout: KeyboardLayout) -> Self {
        Self {
            store,
            keys: layout.key_positions(),
        }
    }

    pub fn store(&self) -> &Arc<DictionaryStore> {
        &self.store
    }

    pub fn keyboard_layout(&self) -> KeyboardLayout {
        self.keys.layout()
    }

    pub fn set_keyboard_layout(&mut self, layout: KeyboardLayout) {
        if layout != self.keys.layout() {
            self.keys = layout.key_positions();
        }
    }

    fn locale(&self) -> CaseLocale {
        self.store.config().case_locale
    }

    pub fn suggest(&self, word: &str, options: &SuggestOptions) -> Vec<SuggestionCandidate> {
        if word.trim().is_empty() || options.limit == 0 || !self.store.is_ready() {
            return Vec::new();
        }

        let Some(split) = split_apostrophe_word(word) else {
            return self.suggest_internal(word, options.limit, options);
        };

        // Rank the root alone so the prefix does not distort distances.
        let root_limit = (options.limit * 2).min(12);
        let recomposed: Vec<SuggestionCandidate> = self
            .suggest_internal(&split.root, root_limit, options)
            .into_iter()
            .filter(|c| c.edit_distance <= 1)
            .take(options.limit * 2)
            .filter_map(|c| {
                let candidate = recompose_apostrophe_candidate(&split, &c.candidate, self.locale())?;
                Some(SuggestionCandidate { candidate, ..c })
            })
            .take(options.limit)
            .collect();
        if !recomposed.is_empty() {
            return recomposed;
        }

        let prefix = self.locale().lowercase(&split.prefix);
        self.suggest_internal(word, options.limit, options)
            .into_iter()
            .filter(|c| self.locale().lowercase(&canonical_apostrophes(&c.candidate)).starts_with(&prefix))
            .collect()
    }

    fn suggest_internal(&self, current_word: &str, limit: usize, options: &SuggestOptions) -> Vec<SuggestionCandidate> {
        let normalizer = self.store.normalizer();
        let normalized_word = normalizer.apostrophe_key(current_word);
        let input: Vec<char> = normalized_word.chars().collect();
        let input_len = input.len();
        if input_len < 1 {
            return Vec::new();
        }
        let current_len = current_word.chars().count();

        let min_completion_frequency = match input_len {
            0..=2 => 300,
            3 => 250,
            4 => 200,
            _ => 150,
        };
        let completions: Vec<DictionaryEntry> = self
            .store
            .lookup_by_prefix_merged(&normalized_word, 200)
            .into_iter()
            .filter(|e| {
                let meets_frequency = e.source == Source::User || e.effective_frequency() >= min_completion_frequency;
                normalizer.apostrophe_key(&e.word).starts_with(&normalized_word)
                    && e.word.chars().count() > current_len
                    && meets_frequency
            })
            .collect();

        let mut fuzzy = match input_len {
            1 => Vec::new(),
            2..=3 => self.store.fuzzy_lookup(&normalized_word, limit * 2),
            _ => self.store.fuzzy_lookup(&normalized_word, limit * 4),
        };
        if options.accent_matching && input_len > 1 {
            let accentless = normalizer.strip_accents(&normalized_word);
            if accentless != normalized_word {
                fuzzy.extend(self.store.fuzzy_lookup(&accentless, limit * 2));
            }
        }

        let leading = current_word.chars().next();
        let short_elisions: Vec<DictionaryEntry> = match leading {
            Some(first) if input_len == 1 => self
                .store
                .lookup_by_prefix_merged(&format!("{}{}", normalized_word, APOSTROPHE), 80)
                .into_iter()
                .filter(|e| is_short_elision(&e.word, first))
                .collect(),
            _ => Vec::new(),
        };

        let mut pass = RankingPass {
            ranker: self,
            options,
            current_word,
            current_len,
            normalized_word: &normalized_word,
            bare_word: normalized_word.replace(APOSTROPHE, ""),
            input: &input,
            seen: HashSet::new(),
            found: Vec::new(),
        };

        if input_len == 1 {
            let frequency = u32::from(self.store.get_exact_word_frequency(current_word));
            pass.consider(&normalized_word, 0, frequency, false, None);
        }
        for entry in completions {
            let term = normalizer.apostrophe_key(&entry.word);
            let frequency = u32::from(entry.frequency);
            pass.consider(&term, 0, frequency, true, Some(vec![entry]));
        }
        for entry in short_elisions {
            let term = normalizer.apostrophe_key(&entry.word);
            pass.consider(&term, 0, u32::from(entry.frequency), true, None);
        }
        for item in fuzzy {
            pass.consider(&item.term, item.distance, item.frequency, false, None);
        }

        let mut found = pass.found;
        found.sort_by(|a, b| self.compare(a, b, current_word, current_len, &normalized_word, input_len));
        found.truncate(limit);
        debug!(
            "[SuggestionRanker] '{}' -> {:?}",
            current_word,
            found.iter().map(|c| c.candidate.as_str()).collect::<Vec<_>>()
        );
        found
    }

    fn compare(
        &self,
        a: &SuggestionCandidate,
        b: &SuggestionCandidate,
        current_word: &str,
        current_len: usize,
        normalized_word: &str,
        input_len: usize,
    ) -> Ordering {
        let normalizer = self.store.normalizer();
        let is_prefix_tier = |c: &SuggestionCandidate| {
            let norm = normalizer.apostrophe_key(&c.candidate);
            if input_len == 1 {
                norm == normalized_word && c.candidate != current_word
            } else {
                norm.starts_with(normalized_word) && c.candidate.chars().count() > current_len
            }
        };
        let user = |c: &SuggestionCandidate| c.source == Source::User;

        user(b)
            .cmp(&user(a))
            .then_with(|| is_prefix_tier(b).cmp(&is_prefix_tier(a)))
            .then_with(|| a.edit_distance.cmp(&b.edit_distance))
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.candidate.chars().count().cmp(&b.candidate.chars().count()))
    }

    fn is_nearby_substitution(&self, input: &[char], suggestion: &[char]) -> bool {
        if input.len() != suggestion.len() || is_transposition(input, suggestion) {
            return true;
        }
        input
            .iter()
            .zip(suggestion)
            .filter(|(a, b)| lower(**a) != lower(**b))
            .all(|(a, b)| self.keys.distance(*a, *b).map_or(true, |d| d <= NEARBY_KEY_DISTANCE))
    }

    fn is_adjacent_substitution(&self, input: &[char], suggestion: &[char]) -> bool {
        if input.len() != suggestion.len() {
            return false;
        }
        if is_transposition(input, suggestion) {
            return true;
        }
        input
            .iter()
            .zip(suggestion)
            .filter(|(a, b)| lower(**a) != lower(**b))
            .all(|(a, b)| self.keys.distance(*a, *b).is_some_and(|d| d <= ADJACENT_KEY_DISTANCE))
    }
}

fn is_short_elision(word: &str, leading: char) -> bool {
    let chars: Vec<char> = canonical_apostrophes(word).chars().collect();
    (2..=3).contains(&chars.len()) && lower(chars[0]) == lower(leading) && chars[1] == APOSTROPHE
}

/// State of one `suggest_internal` call.
struct RankingPass<'a> {
    ranker: &'a SuggestionRanker,
    options: &'a SuggestOptions,
    current_word: &'a str,
    current_len: usize,
    normalized_word: &'a str,
    bare_word: String,
    input: &'a [char],
    seen: HashSet<String>,
    found: Vec<SuggestionCandidate>,
}

impl RankingPass<'_> {
    fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Rare-word floor for prefix matches, on raw frequency.
    fn min_prefix_frequency(&self) -> u32 {
        match self.input_len() {
            0..=2 => 150,
            3 => 100,
            4 => 80,
            _ => 60,
        }
    }

    fn consider(
        &mut self,
        term: &str,
        distance: usize,
        frequency: u32,
        forced_prefix: bool,
        override_candidates: Option<Vec<DictionaryEntry>>,
    ) {
        let input_len = self.input_len();
        let term_chars: Vec<char> = term.chars().collect();
        if input_len <= 2 && term_chars.len() == 1 && term != self.normalized_word {
            return;
        }
        if input_len <= 2 && distance > 1 {
            return;
        }

        let min_frequency = self.min_prefix_frequency();
        let term_is_prefix = term.starts_with(self.normalized_word) && term_chars.len() > input_len;
        if term_is_prefix && frequency < min_frequency && override_candidates.is_none() {
            return;
        }

        let kind = edit_type(self.input, &term_chars);
        if self.options.keyboard_proximity
            && distance > 0
            && kind == EditType::Substitute
            && !self.ranker.is_nearby_substitution(self.input, &term_chars)
        {
            return;
        }

        let store = &self.ranker.store;
        let candidates = match override_candidates {
            Some(list) => list,
            None => {
                let key = store.normalizer().key(term);
                if input_len == 1 {
                    store.top_by_normalized(&key, 5)
                } else if distance == 0 {
                    store.top_by_normalized(&key, 3)
                } else {
                    store.best_entry_for_normalized(&key).into_iter().collect()
                }
            }
        };

        let edit_type_bonus = if self.options.edit_type_ranking && distance > 0 {
            match kind {
                EditType::Insert => 0.5,
                EditType::Substitute => {
                    if self.options.keyboard_proximity && self.ranker.is_adjacent_substitution(self.input, &term_chars) {
                        0.4
                    } else {
                        0.2
                    }
                }
                EditType::Delete => {
                    if has_adjacent_duplicates(self.input) && fixes_duplicate_letter(self.input, &term_chars) {
                        0.3
                    } else if has_adjacent_duplicates(self.input) {
                        0.1
                    } else {
                        0.0
                    }
                }
                EditType::Other => 0.0,
            }
        } else {
            0.0
        };

        for entry in candidates {
            if entry.word == self.current_word {
                continue;
            }
            if let Some(candidate) = self.score(&entry, distance, forced_prefix, edit_type_bonus, min_frequency) {
                let key = self.ranker.locale().lowercase(&entry.word);
                if self.seen.insert(key) {
                    self.found.push(candidate);
                }
            }
        }
    }

    fn score(
        &self,
        entry: &DictionaryEntry,
        distance: usize,
        forced_prefix: bool,
        edit_type_bonus: f64,
        min_frequency: u32,
    ) -> Option<SuggestionCandidate> {
        let input_len = self.input_len();
        let single_char = input_len == 1;
        let word_chars: Vec<char> = entry.word.chars().collect();
        let candidate_len = word_chars.len();
        let norm_candidate = self.ranker.store.normalizer().apostrophe_key(&entry.word);
        let is_prefix = norm_candidate.starts_with(self.normalized_word);
        let is_completion = is_prefix && candidate_len > self.current_len;

        if is_completion && entry.source != Source::User && u32::from(entry.frequency) < min_frequency {
            return None;
        }

        // Likely a proper noun ("Hardy" while typing "hard").
        let input_lowercase = self.current_word.chars().next().is_some_and(char::is_lowercase);
        let candidate_capitalized = word_chars.first().is_some_and(|c| c.is_uppercase());
        if is_prefix && input_lowercase && candidate_capitalized && entry.source != Source::User {
            return None;
        }

        let locale = self.ranker.locale();
        let has_accent = word_chars.iter().any(|c| ACCENT_CHARS.contains(c));
        let has_digit = word_chars.iter().any(|c| c.is_numeric());
        let has_symbol = word_chars.iter().any(|c| !c.is_alphanumeric() && *c != APOSTROPHE && *c != '\u{2019}');
        let same_base_letter = locale.lowercase(&entry.word) == locale.lowercase(self.current_word);
        let short_elision = self
            .current_word
            .chars()
            .next()
            .is_some_and(|first| is_short_elision(&entry.word, first));

        let distance_score = 1.0 / (1.0 + distance as f64);
        let frequency_score = f64::from(entry.effective_frequency()) / f64::from(EFFECTIVE_FREQUENCY_MAX);
        let prefix_bonus = match () {
            _ if single_char && forced_prefix => 0.0,
            _ if input_len <= 2 && forced_prefix => 2.0,
            _ if input_len <= 2 && is_completion => 1.8,
            _ if input_len <= 2 && is_prefix => 1.5,
            _ if forced_prefix => 5.0,
            _ if is_completion => 4.0,
            _ if is_prefix => 3.0,
            _ => 0.0,
        };
        let source_boost = if entry.source == Source::User { USER_SOURCE_BOOST } else { 1.0 };
        let accent_bonus = if single_char && candidate_len == 1 && has_accent { 0.8 } else { 0.0 };
        let accent_same_length_bonus = if !single_char && candidate_len == self.current_len && has_accent {
            0.4
        } else {
            0.0
        };
        let base_letter_malus = if single_char && candidate_len == 1 && !has_accent && same_base_letter {
            -2.0
        } else {
            0.0
        };
        let elision_bonus = match () {
            _ if single_char && short_elision && candidate_len == 2 => 1.0,
            _ if single_char && short_elision => 0.55,
            _ => 0.0,
        };
        let length_penalty = if single_char && candidate_len > 2 {
            -0.2 * (candidate_len - 2) as f64
        } else {
            0.0
        };
        let length_diff = candidate_len.abs_diff(self.current_len);
        let length_similarity = match length_diff {
            0 => 0.35,
            1 => 0.2,
            2 => 0.05,
            d => -0.15 * d.min(4) as f64,
        };
        let special = has_digit || has_symbol;
        let numeric_malus = match () {
            _ if special && distance > 0 && input_len <= 2 => -4.0,
            _ if special && distance > 0 => -2.2,
            _ if has_digit && input_len <= 2 => -3.0,
            _ if has_digit => -1.5,
            _ if has_symbol && input_len <= 2 => -1.2,
            _ if has_symbol => -0.6,
            _ => 0.0,
        };
        let completion_length_penalty =
            if is_completion && self.current_len >= 4 && candidate_len.saturating_sub(self.current_len) >= 3 {
                -0.35
            } else {
                0.0
            };
        let bare_candidate = norm_candidate.replace(APOSTROPHE, "");
        let same_root_bonus = if distance == 1 && bare_candidate == self.bare_word { 0.25 } else { 0.0 };

        let score = (distance_score
            + frequency_score
            + prefix_bonus
            + edit_type_bonus
            + accent_bonus
            + accent_same_length_bonus
            + base_letter_malus
            + elision_bonus
            + length_penalty
            + length_similarity
            + numeric_malus
            + completion_length_penalty
            + same_root_bonus)
            * source_boost;

        Some(SuggestionCandidate {
            candidate: entry.word.clone(),
            edit_distance: distance,
            score,
            source: entry.source,
        })
    }
}

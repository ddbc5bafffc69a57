// File: src/core/dictionary.rs
use crate::config::DictionaryConfig;
use crate::core::normalizer::Normalizer;
use crate::core::types::{effective_frequency, DictionaryEntry, Source};
use crate::error::Result;
use crate::fuzzy::{FuzzyIndex, SerializedIndex, SuggestItem};
use crate::learning::{UserDictionaryStore, UserEntry};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Everything a base dictionary source hands over on load.
#[derive(Debug, Clone, Default)]
pub struct BaseDictionary {
    pub entries: Vec<DictionaryEntry>,
    /// USER-tagged seed words shipped next to the base dictionary.
    pub user_defaults: Vec<DictionaryEntry>,
    /// Precomputed fuzzy index, if the source ships one.
    pub serialized: Option<SerializedIndex>,
}

/// Where the base (MAIN) dictionary comes from.
pub trait DictionarySource: Send + Sync {
    fn load(&self) -> Result<BaseDictionary>;

    fn describe(&self) -> String {
        "dictionary".to_string()
    }
}

/// A base dictionary held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    dictionary: BaseDictionary,
}

impl MemorySource {
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        Self {
            dictionary: BaseDictionary {
                entries,
                ..BaseDictionary::default()
            },
        }
    }

    pub fn with_user_defaults(mut self, defaults: Vec<DictionaryEntry>) -> Self {
        self.dictionary.user_defaults = defaults;
        self
    }

    pub fn with_serialized(mut self, serialized: SerializedIndex) -> Self {
        self.dictionary.serialized = Some(serialized);
        self
    }
}

impl DictionarySource for MemorySource {
    fn load(&self) -> Result<BaseDictionary> {
        Ok(self.dictionary.clone())
    }

    fn describe(&self) -> String {
        format!("memory ({} entries)", self.dictionary.entries.len())
    }
}

#[derive(Debug, Default)]
struct IndexState {
    normalized: HashMap<String, Vec<DictionaryEntry>>,
    prefixes: HashMap<String, Vec<DictionaryEntry>>,
    user_defaults: Vec<DictionaryEntry>,
    fuzzy: FuzzyIndex,
}

/// The merged MAIN + USER dictionary with its lookup structures.
///
/// Entries are grouped by normalized key and into prefix buckets up to
/// `cache_prefix_length` chars, every bucket sorted by effective frequency.
/// The fuzzy index holds one term per normalized key, weighted by the best
/// entry of that key.
///
/// All mutation goes through `writer`. A full rebuild prepares the new
/// state off-lock and swaps it in whole, so readers never see a partial
/// index. Lookups before the first load finishes answer empty.
pub struct DictionaryStore {
    source: Box<dyn DictionarySource>,
    user_store: Arc<dyn UserDictionaryStore>,
    config: DictionaryConfig,
    normalizer: Normalizer,
    state: RwLock<IndexState>,
    writer: Mutex<()>,
    ready: AtomicBool,
    load_started: AtomicBool,
}

impl DictionaryStore {
    pub fn new(
        source: impl DictionarySource + 'static,
        user_store: Arc<dyn UserDictionaryStore>,
        config: DictionaryConfig,
    ) -> Self {
        let normalizer = Normalizer::new(config.case_locale);
        Self {
            source: Box::new(source),
            user_store,
            normalizer,
            state: RwLock::new(IndexState {
                fuzzy: new_fuzzy(&config),
                ..IndexState::default()
            }),
            config,
            writer: Mutex::new(()),
            ready: AtomicBool::new(false),
            load_started: AtomicBool::new(false),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn config(&self) -> &DictionaryConfig {
        &self.config
    }

    pub fn user_store(&self) -> &Arc<dyn UserDictionaryStore> {
        &self.user_store
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_load_started(&self) -> bool {
        self.load_started.load(Ordering::Acquire)
    }

    /// Loads the base dictionary, default user entries and the user store,
    /// once. Concurrent callers wait for the first load instead of repeating it.
    /// A failing base source is logged and replaced by an empty dictionary.
    pub fn load_if_needed(&self) {
        if self.is_ready() {
            return;
        }
        let _writer = self.writer.lock();
        if self.is_ready() {
            return;
        }
        self.load_started.store(true, Ordering::Release);
        let start = Instant::now();

        let base = match self.source.load() {
            Ok(base) => base,
            Err(e) => {
                error!(
                    "[DictionaryStore] Failed to load {}: {}. Continuing without base dictionary",
                    self.source.describe(),
                    e
                );
                BaseDictionary::default()
            }
        };

        let mut next = IndexState::default();
        self.index_entries(&mut next, base.entries);
        next.user_defaults = base.user_defaults.clone();
        self.index_entries(&mut next, base.user_defaults);
        self.index_entries(&mut next, self.current_user_entries());
        next.fuzzy = match base.serialized {
            Some(serialized) => self.fuzzy_from_serialized(&next, &serialized),
            None => self.build_fuzzy(&next),
        };

        let keys = next.normalized.len();
        let prefixes = next.prefixes.len();
        *self.state.write() = next;
        self.ready.store(true, Ordering::Release);
        info!(
            "[DictionaryStore] Loaded {} in {:?} - normalized={} prefixes={}",
            self.source.describe(),
            start.elapsed(),
            keys,
            prefixes
        );
    }

    /// Starts `load_if_needed` on a background thread unless a load already
    /// started.
    pub fn spawn_load(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.is_ready() || self.load_started.swap(true, Ordering::AcqRel) {
            return None;
        }
        let store = Arc::clone(self);
        Some(thread::spawn(move || store.load_if_needed()))
    }

    /// Re-reads the user store: USER entries that disappeared are purged,
    /// defaults and current user words are re-indexed, and the fuzzy index
    /// is rebuilt before the new state is swapped in.
    pub fn refresh_user_entries(&self) {
        if !self.is_ready() {
            if !self.is_load_started() {
                self.load_if_needed();
            }
            if !self.is_ready() {
                return;
            }
        }
        let _writer = self.writer.lock();
        let start = Instant::now();
        let user_entries = self.current_user_entries();

        let (normalized, user_defaults) = {
            let state = self.state.read();
            (state.normalized.clone(), state.user_defaults.clone())
        };
        let keep: HashSet<String> = user_entries.iter().map(|e| self.normalizer.lowercase(&e.word)).collect();
        let mut next = IndexState {
            normalized,
            user_defaults: user_defaults.clone(),
            ..IndexState::default()
        };
        for bucket in next.normalized.values_mut() {
            bucket.retain(|e| e.source != Source::User || keep.contains(&self.normalizer.lowercase(&e.word)));
        }
        next.normalized.retain(|_, bucket| !bucket.is_empty());
        self.rebuild_prefixes(&mut next);
        self.index_entries(&mut next, user_defaults);
        self.index_entries(&mut next, user_entries);
        next.fuzzy = self.build_fuzzy(&next);

        *self.state.write() = next;
        debug!("[DictionaryStore] User entries refreshed in {:?}", start.elapsed());
    }

    /// Adds a word to the user dictionary and merges it into the live index.
    pub fn add_user_entry(&self, word: &str) -> Option<DictionaryEntry> {
        let stored = self.user_store.add_word(word)?;
        let entry = to_user_entry(stored);
        self.merge_user_entry(&entry);
        Some(entry)
    }

    pub fn remove_user_entry(&self, word: &str) -> bool {
        let removed = self.user_store.remove_word(word);
        if !self.is_ready() {
            return removed;
        }
        let key = self.normalizer.key(word);
        let lowered = self.normalizer.lowercase(word.trim());
        let _writer = self.writer.lock();
        let mut state = self.state.write();
        let is_target = |e: &DictionaryEntry| e.source == Source::User && self.normalizer.lowercase(&e.word) == lowered;

        let best = match state.normalized.get_mut(&key) {
            Some(bucket) => {
                bucket.retain(|e| !is_target(e));
                bucket.first().map(DictionaryEntry::effective_frequency)
            }
            None => return removed,
        };
        for prefix in prefixes_of(&key, self.config.cache_prefix_length) {
            if let Some(bucket) = state.prefixes.get_mut(&prefix) {
                bucket.retain(|e| !is_target(e));
                if bucket.is_empty() {
                    state.prefixes.remove(&prefix);
                }
            }
        }
        match best {
            Some(frequency) => state.fuzzy.add_word(&key, frequency),
            None => {
                state.normalized.remove(&key);
                state.fuzzy.remove_word(&key);
            }
        }
        debug!("[DictionaryStore] Removed user word '{}'", word);
        removed
    }

    /// Bumps a word the user picked, if it lives in the user dictionary.
    pub fn mark_used(&self, word: &str) {
        if let Some(stored) = self.user_store.mark_used(word) {
            self.merge_user_entry(&to_user_entry(stored));
        }
    }

    pub fn is_known_word(&self, word: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        let key = self.normalizer.key(word);
        self.state.read().normalized.get(&key).is_some_and(|b| !b.is_empty())
    }

    /// Highest raw frequency among entries spelled like `word` (ignoring
    /// case); 0 when unknown.
    pub fn get_exact_word_frequency(&self, word: &str) -> u8 {
        if !self.is_ready() {
            return 0;
        }
        let key = self.normalizer.key(word);
        let lowered = self.normalizer.lowercase(word);
        let state = self.state.read();
        state
            .normalized
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|e| self.normalizer.lowercase(&e.word) == lowered)
            .map(|e| e.frequency)
            .max()
            .unwrap_or(0)
    }

    /// The longest cached prefix bucket for `prefix` that exists.
    pub fn lookup_by_prefix(&self, prefix: &str) -> Vec<DictionaryEntry> {
        if !self.is_ready() || prefix.trim().is_empty() {
            return Vec::new();
        }
        let key = self.normalizer.key(prefix);
        let state = self.state.read();
        prefixes_of(&key, self.config.cache_prefix_length)
            .into_iter()
            .rev()
            .find_map(|p| state.prefixes.get(&p).filter(|b| !b.is_empty()).cloned())
            .unwrap_or_default()
    }

    /// Merges buckets from the longest cached prefix down to one letter,
    /// deduplicated by lowercase word, stopping at `max_size`.
    pub fn lookup_by_prefix_merged(&self, prefix: &str, max_size: usize) -> Vec<DictionaryEntry> {
        if !self.is_ready() || prefix.trim().is_empty() || max_size == 0 {
            return Vec::new();
        }
        let key = self.normalizer.key(prefix);
        let state = self.state.read();
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for p in prefixes_of(&key, self.config.cache_prefix_length).into_iter().rev() {
            let Some(bucket) = state.prefixes.get(&p) else {
                continue;
            };
            for entry in bucket {
                if seen.insert(self.normalizer.lowercase(&entry.word)) {
                    merged.push(entry.clone());
                    if merged.len() >= max_size {
                        return merged;
                    }
                }
            }
        }
        merged
    }

    pub fn fuzzy_lookup(&self, term: &str, max_suggestions: usize) -> Vec<SuggestItem> {
        if !self.is_ready() {
            return Vec::new();
        }
        self.state.read().fuzzy.lookup(term, max_suggestions)
    }

    /// Highest-weighted entry under a normalized key.
    pub fn best_entry_for_normalized(&self, normalized: &str) -> Option<DictionaryEntry> {
        self.state.read().normalized.get(normalized)?.first().cloned()
    }

    /// Entries under a normalized key, best first. MAIN and USER variants
    /// both show up here.
    pub fn top_by_normalized(&self, normalized: &str, limit: usize) -> Vec<DictionaryEntry> {
        if !self.is_ready() {
            return Vec::new();
        }
        self.state
            .read()
            .normalized
            .get(normalized)
            .map(|bucket| bucket.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn effective_frequency(&self, entry: &DictionaryEntry) -> u32 {
        entry.effective_frequency()
    }

    /// MAIN entries currently indexed.
    pub fn main_entries(&self) -> Vec<DictionaryEntry> {
        let state = self.state.read();
        let mut entries: Vec<DictionaryEntry> = state
            .normalized
            .values()
            .flatten()
            .filter(|e| e.source == Source::Main)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.word.cmp(&b.word));
        entries
    }

    pub fn export_serialized(&self) -> SerializedIndex {
        self.state.read().fuzzy.to_serialized()
    }

    fn current_user_entries(&self) -> Vec<DictionaryEntry> {
        self.user_store.entries().into_iter().map(to_user_entry).collect()
    }

    fn merge_user_entry(&self, entry: &DictionaryEntry) {
        if !self.is_ready() {
            return;
        }
        let key = self.normalizer.key(&entry.word);
        let _writer = self.writer.lock();
        let mut state = self.state.write();
        self.index_entries(&mut state, vec![entry.clone()]);
        if let Some(best) = state.normalized.get(&key).and_then(|b| b.first()).map(DictionaryEntry::effective_frequency) {
            state.fuzzy.add_word(&key, best);
        }
    }

    fn index_entries(&self, state: &mut IndexState, entries: Vec<DictionaryEntry>) {
        let mut touched_keys = HashSet::new();
        let mut touched_prefixes = HashSet::new();
        for entry in entries {
            let key = self.normalizer.key(&entry.word);
            if key.is_empty() {
                warn!("[DictionaryStore] Skipping entry without letters: '{}'", entry.word);
                continue;
            }
            for prefix in prefixes_of(&key, self.config.cache_prefix_length) {
                let bucket = state.prefixes.entry(prefix.clone()).or_default();
                bucket.retain(|e| !e.same_slot(&entry));
                bucket.push(entry.clone());
                touched_prefixes.insert(prefix);
            }
            let bucket = state.normalized.entry(key.clone()).or_default();
            bucket.retain(|e| !e.same_slot(&entry));
            bucket.push(entry);
            touched_keys.insert(key);
        }
        for key in touched_keys {
            if let Some(bucket) = state.normalized.get_mut(&key) {
                sort_by_effective_frequency(bucket);
            }
        }
        for prefix in touched_prefixes {
            if let Some(bucket) = state.prefixes.get_mut(&prefix) {
                sort_by_effective_frequency(bucket);
            }
        }
    }

    fn rebuild_prefixes(&self, state: &mut IndexState) {
        state.prefixes.clear();
        for (key, bucket) in &state.normalized {
            for prefix in prefixes_of(key, self.config.cache_prefix_length) {
                state.prefixes.entry(prefix).or_default().extend(bucket.iter().cloned());
            }
        }
        for bucket in state.prefixes.values_mut() {
            sort_by_effective_frequency(bucket);
        }
    }

    fn build_fuzzy(&self, state: &IndexState) -> FuzzyIndex {
        let mut fuzzy = new_fuzzy(&self.config);
        for (key, bucket) in &state.normalized {
            if let Some(best) = bucket.first() {
                fuzzy.add_word(key, best.effective_frequency());
            }
        }
        fuzzy
    }

    /// Uses the shipped index, re-weighted with runtime frequencies, and adds
    /// whatever words it does not cover.
    fn fuzzy_from_serialized(&self, state: &IndexState, serialized: &SerializedIndex) -> FuzzyIndex {
        let terms: HashMap<String, u32> = state
            .normalized
            .iter()
            .filter(|(key, _)| serialized.terms.contains_key(*key))
            .filter_map(|(key, bucket)| bucket.first().map(|best| (key.clone(), best.effective_frequency())))
            .collect();
        let mut fuzzy = FuzzyIndex::new(serialized.max_edit_distance, serialized.prefix_length)
            .with_locale(self.config.case_locale);
        fuzzy.load_serialized(&terms, &serialized.deletes);
        let mut added = 0usize;
        for (key, bucket) in &state.normalized {
            if !terms.contains_key(key) {
                if let Some(best) = bucket.first() {
                    fuzzy.add_word(key, best.effective_frequency());
                    added += 1;
                }
            }
        }
        info!(
            "[DictionaryStore] Loaded precomputed fuzzy index: {} delete keys, {} extra terms",
            serialized.deletes.len(),
            added
        );
        fuzzy
    }
}

fn new_fuzzy(config: &DictionaryConfig) -> FuzzyIndex {
    FuzzyIndex::new(config.max_edit_distance, config.fuzzy_prefix_length).with_locale(config.case_locale)
}

fn to_user_entry(stored: UserEntry) -> DictionaryEntry {
    DictionaryEntry::user(stored.word, stored.frequency)
}

/// Prefixes of `key` of length 1..=min(len, max), shortest first.
fn prefixes_of(key: &str, max: usize) -> Vec<String> {
    key.char_indices()
        .map(|(idx, c)| key[..idx + c.len_utf8()].to_string())
        .take(max)
        .collect()
}

fn sort_by_effective_frequency(bucket: &mut [DictionaryEntry]) {
    bucket.sort_by_key(|e| std::cmp::Reverse(e.effective_frequency()));
}

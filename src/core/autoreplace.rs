// File: src/core/autoreplace.rs
use crate::config::SuggestionSettings;
use crate::core::casing::CaseLocale;
use crate::core::normalizer::{canonical_apostrophe, strip_accents_uncached, Normalizer, APOSTROPHE};
use crate::core::punctuation::{is_boundary_punctuation, Boundary, BOUNDARY};
use crate::core::ranker::{recompose_apostrophe_candidate, split_apostrophe_word, SuggestOptions, SuggestionRanker};
use crate::core::tracker::{WordObserver, WordTracker};
use crate::core::types::SuggestionCandidate;
use crate::host::{KeyEvent, TextEditor};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Chars inspected for a symbol sitting between the word and the cursor.
const HARD_BOUNDARY_WINDOW: usize = 32;
const MAX_LENGTH_RATIO: f64 = 1.25;
const MIN_WORD_LENGTH: usize = 3;
const MIN_ACCENT_FIX_LENGTH: usize = 2;

/// Set when the engine, not the user, typed the trailing space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSpaceMarker {
    pending: bool,
}

impl AutoSpaceMarker {
    pub fn mark(&mut self) {
        debug!("[AutoSpace] pending");
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = false;
    }

    /// Returns whether a space was pending, clearing the flag.
    pub fn consume(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Turns a pending `"word "` into `"word<punctuation> "`.
    pub fn replace_with_punctuation(&mut self, editor: &mut dyn TextEditor, punctuation: char) -> bool {
        if !self.consume() {
            return false;
        }
        let before = editor.text_before_cursor(1).unwrap_or_default();
        if !before.ends_with(' ') {
            return false;
        }
        editor.begin_batch_edit();
        let swapped = editor.delete_surrounding(1, 0) && editor.commit_text(&format!("{} ", punctuation));
        editor.end_batch_edit();
        if !swapped {
            warn!("[AutoSpace] Host refused to swap space for '{}'", punctuation);
        }
        swapped
    }
}

/// What `handle_boundary` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub replaced: bool,
    /// The boundary char reached the editor.
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LastReplacement {
    original: String,
    replacement: String,
    /// Normalized keys to reject if this replacement is undone.
    rejection_keys: Vec<String>,
}

/// True when the two words differ only by diacritics (`perche` / `perché`).
pub fn is_accent_only_variant(input: &str, candidate: &str, locale: CaseLocale) -> bool {
    let input = locale.lowercase(input);
    let candidate = locale.lowercase(candidate);
    input != candidate && strip_accents_uncached(&input) == strip_accents_uncached(&candidate)
}

/// The text before the cursor ends with a symbol (emoji, math sign...)
/// once trailing whitespace and boundary punctuation are skipped.
fn has_trailing_hard_boundary(text: &str) -> bool {
    for c in text.chars().rev().map(canonical_apostrophe) {
        if c.is_whitespace() || BOUNDARY.contains(c) {
            continue;
        }
        return !(c.is_alphanumeric() || c == APOSTROPHE);
    }
    false
}

fn ends_with_space(editor: &dyn TextEditor) -> bool {
    editor.text_before_cursor(2).is_some_and(|t| t.ends_with(' '))
}

/// Commits a space after a replacement, falling back to a key event.
fn ensure_trailing_space(editor: &mut dyn TextEditor) -> bool {
    if ends_with_space(&*editor) {
        return true;
    }
    editor.commit_text(" ");
    if ends_with_space(&*editor) {
        return true;
    }
    editor.send_key_event(KeyEvent::Space);
    ends_with_space(&*editor)
}

/// Keys of the word and, for elisions, of its root.
fn rejection_keys(word: &str, normalizer: &Normalizer) -> Vec<String> {
    let mut keys = vec![normalizer.key(word)];
    if let Some(split) = split_apostrophe_word(word) {
        keys.push(normalizer.key(&split.root));
    }
    keys.retain(|k| !k.is_empty());
    keys
}

/// Decides at each word boundary whether to silently replace the typed word.
///
/// Only unknown words are replaced (an accent-only fix of a word whose
/// exact spelling is unknown counts as unknown), and only when the best
/// candidate is close and not much longer. The last replacement can be
/// undone with one backspace; undone words are not replaced again until
/// the session resets.
#[derive(Debug, Default)]
pub struct AutoReplaceDecider {
    last_replacement: Option<LastReplacement>,
    rejected: HashSet<String>,
    last_undo_original: Option<String>,
}

impl AutoReplaceDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending_undo(&self) -> bool {
        self.last_replacement.is_some()
    }

    /// Undone words are remembered by their normalized key, so casing and
    /// accents do not bring a rejected typo back.
    pub fn is_rejected(&self, word: &str, normalizer: &Normalizer) -> bool {
        self.rejected.contains(&normalizer.key(word))
    }

    pub fn handle_boundary<O: WordObserver>(
        &mut self,
        boundary: Option<Boundary>,
        tracker: &mut WordTracker<O>,
        editor: &mut dyn TextEditor,
        ranker: &SuggestionRanker,
        settings: &SuggestionSettings,
        auto_space: &mut AutoSpaceMarker,
    ) -> ReplaceOutcome {
        let pass_through = |tracker: &mut WordTracker<O>, editor: &mut dyn TextEditor, auto_space: &mut AutoSpaceMarker| {
            tracker.on_boundary_reached(boundary, editor, auto_space);
            ReplaceOutcome {
                replaced: false,
                committed: boundary.is_some(),
            }
        };

        if !settings.auto_replace_enabled {
            return pass_through(tracker, editor, auto_space);
        }
        let before = editor.text_before_cursor(HARD_BOUNDARY_WINDOW).unwrap_or_default();
        if has_trailing_hard_boundary(&before) {
            debug!("[AutoReplace] Symbol before cursor, skipping");
            return pass_through(tracker, editor, auto_space);
        }
        let word = tracker.current_word().to_string();
        if word.trim().is_empty() {
            return pass_through(tracker, editor, auto_space);
        }

        let Some(replacement) = self.approved_replacement(&word, ranker, settings) else {
            self.last_replacement = None;
            return pass_through(tracker, editor, auto_space);
        };

        let locale = ranker.store().config().case_locale;
        let replacement = locale.apply_casing(&replacement.candidate, &word, false);
        editor.begin_batch_edit();
        let deleted = editor.delete_surrounding(word.chars().count(), 0);
        if !deleted {
            warn!("[AutoReplace] Host refused to delete '{}'", word);
        }
        let written = editor.commit_text(&replacement) && deleted;
        if written {
            ranker.store().mark_used(&replacement);
            self.last_replacement = Some(LastReplacement {
                original: word.clone(),
                replacement: replacement.clone(),
                rejection_keys: rejection_keys(&word, ranker.store().normalizer()),
            });
        } else {
            warn!("[AutoReplace] Host refused replacement '{}' -> '{}'", word, replacement);
            self.last_replacement = None;
        }
        tracker.reset();
        editor.end_batch_edit();

        let append_boundary = match boundary {
            Some(Boundary::Space) => !replacement.ends_with(APOSTROPHE),
            Some(_) => true,
            None => false,
        };
        let committed = match boundary {
            Some(Boundary::Space) if append_boundary => ensure_trailing_space(editor),
            Some(b) if append_boundary => editor.commit_text(&b.as_char().to_string()),
            _ => false,
        };
        if committed && boundary == Some(Boundary::Space) {
            auto_space.mark();
        }
        info!("[AutoReplace] '{}' -> '{}' (boundary committed: {})", word, replacement, committed);

        ReplaceOutcome {
            replaced: written,
            committed,
        }
    }

    /// The candidate to write in place of `word`, if every safety gate passes.
    fn approved_replacement(
        &self,
        word: &str,
        ranker: &SuggestionRanker,
        settings: &SuggestionSettings,
    ) -> Option<SuggestionCandidate> {
        let store = ranker.store();
        let locale = store.config().case_locale;
        let split = split_apostrophe_word(word);
        let lookup_word = split.as_ref().map_or(word, |s| s.root.as_str());

        let options = SuggestOptions {
            limit: 1,
            ..SuggestOptions::from(settings)
        };
        let top = ranker.suggest(lookup_word, &options).into_iter().next()?;
        let top = match &split {
            Some(split) => {
                let candidate = recompose_apostrophe_candidate(split, &top.candidate, locale)?;
                SuggestionCandidate { candidate, ..top }
            }
            None => top,
        };

        let accent_variant = is_accent_only_variant(word, &top.candidate, locale);
        let min_length = if accent_variant { MIN_ACCENT_FIX_LENGTH } else { MIN_WORD_LENGTH };
        let max_candidate_length = (word.chars().count() as f64 * MAX_LENGTH_RATIO).floor() as usize;
        let known = store.is_known_word(lookup_word);
        let exact_known = store.get_exact_word_frequency(lookup_word) > 0;
        let rejected = self.is_rejected(word, store.normalizer());

        let approved = (!known || (accent_variant && !exact_known))
            && !rejected
            && top.edit_distance <= settings.max_auto_replace_distance
            && lookup_word.chars().count() >= min_length
            && top.candidate.chars().count() <= max_candidate_length;
        debug!(
            "[AutoReplace] '{}' top='{}' d={} known={} exact={} accent={} rejected={} -> {}",
            word, top.candidate, top.edit_distance, known, exact_known, accent_variant, rejected, approved
        );
        approved.then_some(top)
    }

    /// Reverts the last replacement when `key` is a delete right after it.
    pub fn handle_backspace_undo(
        &mut self,
        key: KeyEvent,
        editor: &mut dyn TextEditor,
        settings: &SuggestionSettings,
    ) -> bool {
        if !settings.auto_replace_enabled || key != KeyEvent::Delete {
            return false;
        }
        let Some(last) = self.last_replacement.as_ref() else {
            return false;
        };
        let replaced: Vec<char> = last.replacement.chars().collect();
        let Some(before) = editor.text_before_cursor(replaced.len() + 2) else {
            return false;
        };
        let before: Vec<char> = before.chars().collect();
        let n = before.len();
        let ends_with_replacement = |skip: usize| n >= replaced.len() + skip && before[n - skip - replaced.len()..n - skip] == replaced[..];
        let trailing_boundary = before
            .last()
            .is_some_and(|c| c.is_whitespace() || is_boundary_punctuation(*c));

        let to_delete = if ends_with_replacement(0) {
            replaced.len()
        } else if trailing_boundary && ends_with_replacement(1) {
            replaced.len() + 1
        } else {
            debug!("[AutoReplace] Text moved on, nothing to undo");
            return false;
        };

        editor.begin_batch_edit();
        let restored = editor.delete_surrounding(to_delete, 0) && editor.commit_text(&last.original);
        editor.end_batch_edit();
        if !restored {
            warn!("[AutoReplace] Host refused undo of '{}'", last.replacement);
        }

        let original = last.original.clone();
        self.rejected.extend(last.rejection_keys.iter().cloned());
        info!("[AutoReplace] Undo '{}' -> '{}'", last.replacement, original);
        self.last_undo_original = Some(original);
        self.last_replacement = None;
        true
    }

    pub fn clear_last_replacement(&mut self) {
        self.last_replacement = None;
    }

    /// Word restored by the most recent undo, handed out once.
    pub fn take_last_undo_original(&mut self) -> Option<String> {
        self.last_undo_original.take()
    }

    /// Forgets the last replacement and every rejected word.
    pub fn reset(&mut self) {
        self.last_replacement = None;
        self.last_undo_original = None;
        self.rejected.clear();
    }
}

use crate::config::SuggestionSettings;
use crate::core::autoreplace::{AutoReplaceDecider, AutoSpaceMarker, ReplaceOutcome};
use crate::core::dictionary::DictionaryStore;
use crate::core::normalizer::{canonical_apostrophes, APOSTROPHE};
use crate::core::punctuation::{word_at_cursor, Boundary, WordAtCursor};
use crate::core::ranker::{SuggestOptions, SuggestionRanker};
use crate::core::tracker::{WordEvent, WordObserver, WordTracker};
use crate::core::types::{DictionaryEntry, SuggestionCandidate};
use crate::host::{KeyEvent, TextEditor};
use log::{debug, warn};
use std::sync::Arc;

/// Called with the fresh suggestion list whenever it changes.
pub type SuggestionListener = Box<dyn FnMut(&[SuggestionCandidate]) + Send>;

/// Flags that the tracked word changed since suggestions were last computed.
#[derive(Debug, Default)]
struct WordChanged(bool);

impl WordObserver for WordChanged {
    fn on_word_event(&mut self, _event: WordEvent<'_>) {
        self.0 = true;
    }
}

// One typing session: the tracker, the decider and the auto-space marker
// are owned here and only touched by the thread driving keystrokes. The
// dictionary store is the only shared piece.
pub struct TypingEngine {
    store: Arc<DictionaryStore>,
    ranker: SuggestionRanker,
    tracker: WordTracker<WordChanged>,
    decider: AutoReplaceDecider,
    auto_space: AutoSpaceMarker,
    settings: SuggestionSettings,
    suggestions: Vec<SuggestionCandidate>,
    pending_add_word: Option<String>,
    listener: Option<SuggestionListener>,
}

impl TypingEngine {
    pub fn new(store: Arc<DictionaryStore>, settings: SuggestionSettings) -> Self {
        Self {
            ranker: SuggestionRanker::new(Arc::clone(&store), settings.keyboard_layout),
            tracker: WordTracker::with_observer(settings.max_word_length, WordChanged::default()),
            store,
            decider: AutoReplaceDecider::new(),
            auto_space: AutoSpaceMarker::default(),
            settings,
            suggestions: Vec::new(),
            pending_add_word: None,
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: impl FnMut(&[SuggestionCandidate]) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn store(&self) -> &Arc<DictionaryStore> {
        &self.store
    }

    pub fn settings(&self) -> &SuggestionSettings {
        &self.settings
    }

    pub fn current_word(&self) -> &str {
        self.tracker.current_word()
    }

    pub fn suggestions(&self) -> &[SuggestionCandidate] {
        &self.suggestions
    }

    pub fn auto_space_pending(&self) -> bool {
        self.auto_space.is_pending()
    }

    /// Word the user just restored with undo, offered for the user dictionary.
    pub fn pending_add_word(&self) -> Option<&str> {
        self.pending_add_word.as_deref()
    }

    pub fn clear_pending_add_word(&mut self) {
        self.pending_add_word = None;
    }

    /// Starts the background dictionary load if nobody has yet.
    pub fn preload(&self) {
        if !self.store.is_ready() && !self.store.is_load_started() {
            // The handle is dropped; the load thread runs detached.
            let _ = self.store.spawn_load();
        }
    }

    pub fn update_settings(&mut self, settings: SuggestionSettings) {
        self.ranker.set_keyboard_layout(settings.keyboard_layout);
        self.tracker.set_max_len(settings.max_word_length);
        let suggestions_toggled = settings.suggestions_enabled != self.settings.suggestions_enabled;
        self.settings = settings;
        if suggestions_toggled {
            self.refresh_suggestions();
        }
        self.flush_word_changes();
    }

    /// Text the host already committed at the cursor.
    pub fn on_character_committed(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.preload();
        let text = canonical_apostrophes(text);
        self.decider.clear_last_replacement();
        self.auto_space.clear();
        if text.chars().any(char::is_alphanumeric) {
            self.pending_add_word = None;
        }
        self.tracker.on_character_committed(&text);
        self.flush_word_changes();
    }

    /// Returns `true` when the delete key undid an auto-replacement, in
    /// which case the host must not delete anything itself.
    pub fn on_backspace(&mut self, editor: &mut dyn TextEditor) -> bool {
        self.auto_space.clear();
        if self.decider.handle_backspace_undo(KeyEvent::Delete, editor, &self.settings) {
            self.pending_add_word = self.decider.take_last_undo_original();
            self.resync_from(&*editor);
            self.flush_word_changes();
            return true;
        }
        self.tracker.on_backspace();
        self.flush_word_changes();
        false
    }

    /// Space, enter or punctuation. The engine commits the boundary char.
    pub fn on_boundary(&mut self, boundary: char, editor: &mut dyn TextEditor) -> ReplaceOutcome {
        self.preload();
        // The host may have moved text under us since the last keystroke.
        if self.store.is_ready() {
            self.resync_from(&*editor);
        }
        let outcome = self.decider.handle_boundary(
            Some(Boundary::from_char(boundary)),
            &mut self.tracker,
            editor,
            &self.ranker,
            &self.settings,
            &mut self.auto_space,
        );
        if !outcome.replaced {
            self.pending_add_word = None;
        }
        self.tracker.observer_mut().0 = false;
        self.set_suggestions(Vec::new());
        outcome
    }

    pub fn on_cursor_moved(&mut self, editor: &dyn TextEditor) {
        self.tracker.on_cursor_moved();
        self.decider.clear_last_replacement();
        self.auto_space.clear();
        let at_cursor = self.word_at(editor);
        if let Some(pending) = &self.pending_add_word {
            let still_on_word = at_cursor
                .as_ref()
                .is_some_and(|w| w.word.to_lowercase() == pending.to_lowercase());
            if !still_on_word {
                self.pending_add_word = None;
            }
        }
        if self.store.is_ready() {
            if let Some(w) = at_cursor {
                self.tracker.set_word(&w.word);
            }
        }
        self.flush_word_changes();
    }

    pub fn on_context_changed(&mut self) {
        self.tracker.on_context_changed();
        self.decider.reset();
        self.auto_space.clear();
        self.pending_add_word = None;
        self.tracker.observer_mut().0 = false;
        self.set_suggestions(Vec::new());
    }

    /// Replaces the word around the cursor with `suggestion`, re-cased like
    /// the typed word, and follows it with an auto-space unless it ends in
    /// an apostrophe.
    pub fn accept_suggestion(
        &mut self,
        editor: &mut dyn TextEditor,
        suggestion: &str,
        force_leading_capital: bool,
    ) -> bool {
        if suggestion.trim().is_empty() {
            return false;
        }
        let locale = self.store.config().case_locale;
        let at_cursor = self.word_at(&*editor);
        let typed = at_cursor
            .as_ref()
            .map_or_else(|| self.tracker.current_word().to_string(), |w| w.word.clone());
        let replacement = locale.apply_casing(suggestion, &typed, force_leading_capital);
        let with_space = !replacement.ends_with(APOSTROPHE) && !replacement.ends_with('\u{2019}');

        editor.begin_batch_edit();
        let cleared = at_cursor
            .as_ref()
            .map_or(true, |w| editor.delete_surrounding(w.chars_before, w.chars_after));
        let text = if with_space { format!("{} ", replacement) } else { replacement.clone() };
        let written = cleared && editor.commit_text(&text);
        editor.end_batch_edit();
        if !written {
            warn!("[TypingEngine] Host refused suggestion '{}'", replacement);
            return false;
        }

        debug!("[TypingEngine] Accepted '{}' for '{}'", replacement, typed);
        self.store.mark_used(suggestion);
        self.decider.clear_last_replacement();
        self.pending_add_word = None;
        if with_space {
            self.auto_space.mark();
        } else {
            self.auto_space.clear();
        }
        self.tracker.reset();
        if !with_space {
            // An elision keeps the word open: "dell'" + "acqua".
            self.tracker.set_word(&canonical_apostrophes(&replacement));
        }
        self.flush_word_changes();
        true
    }

    pub fn add_user_word(&mut self, word: &str) -> Option<DictionaryEntry> {
        let entry = self.store.add_user_entry(word)?;
        if self
            .pending_add_word
            .as_ref()
            .is_some_and(|p| p.to_lowercase() == entry.word.to_lowercase())
        {
            self.pending_add_word = None;
        }
        self.refresh_suggestions();
        Some(entry)
    }

    pub fn remove_user_word(&mut self, word: &str) -> bool {
        let removed = self.store.remove_user_entry(word);
        if removed {
            self.refresh_suggestions();
        }
        removed
    }

    pub fn mark_used(&self, word: &str) {
        self.store.mark_used(word);
    }

    fn word_at(&self, editor: &dyn TextEditor) -> Option<WordAtCursor> {
        let window = self.settings.max_word_length;
        let before = editor.text_before_cursor(window).unwrap_or_default();
        let after = editor.text_after_cursor(window).unwrap_or_default();
        word_at_cursor(&before, &after)
    }

    fn resync_from(&mut self, editor: &dyn TextEditor) {
        match self.word_at(editor) {
            Some(w) if w.word != self.tracker.current_word() => {
                debug!("[TypingEngine] Resync tracker to '{}'", w.word);
                self.tracker.set_word(&w.word);
            }
            Some(_) => {}
            None => self.tracker.reset(),
        }
    }

    fn flush_word_changes(&mut self) {
        if std::mem::take(&mut self.tracker.observer_mut().0) {
            self.refresh_suggestions();
        }
    }

    fn refresh_suggestions(&mut self) {
        let word = self.tracker.current_word();
        let next = if self.settings.suggestions_enabled && !word.is_empty() {
            self.ranker.suggest(word, &SuggestOptions::from(&self.settings))
        } else {
            Vec::new()
        };
        self.set_suggestions(next);
    }

    fn set_suggestions(&mut self, suggestions: Vec<SuggestionCandidate>) {
        if suggestions == self.suggestions {
            return;
        }
        self.suggestions = suggestions;
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.suggestions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DictionaryConfig;
    use crate::core::dictionary::MemorySource;
    use crate::host::MemoryEditor;
    use crate::learning::MemoryUserDictionary;
    use std::sync::Mutex;

    fn engine() -> TypingEngine {
        let entries = vec![
            DictionaryEntry::main("ciao", 255),
            DictionaryEntry::main("ciaone", 200),
            DictionaryEntry::main("the", 255),
            DictionaryEntry::main("dell'", 220),
        ];
        let store = Arc::new(DictionaryStore::new(
            MemorySource::new(entries),
            Arc::new(MemoryUserDictionary::new()),
            DictionaryConfig::default(),
        ));
        store.load_if_needed();
        TypingEngine::new(store, SuggestionSettings::default())
    }

    fn type_into(engine: &mut TypingEngine, editor: &mut MemoryEditor, text: &str) {
        editor.type_text(text);
        engine.on_character_committed(text);
    }

    #[test]
    fn listener_sees_suggestion_changes() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.set_listener(move |list: &[SuggestionCandidate]| {
            sink.lock().unwrap().push(list.iter().map(|c| c.candidate.clone()).collect::<Vec<_>>());
        });
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "cia");
        assert_eq!(engine.suggestions()[0].candidate, "ciao");
        engine.on_boundary(' ', &mut editor);
        assert!(engine.suggestions().is_empty());
        assert_eq!(seen.lock().unwrap().last().map(Vec::len), Some(0));
    }

    #[test]
    fn accept_replaces_whole_word_and_marks_auto_space() {
        let mut engine = engine();
        let mut editor = MemoryEditor::with_text("Cia tutti");
        editor.set_cursor(2);
        engine.on_cursor_moved(&editor);
        assert_eq!(engine.current_word(), "Cia");
        assert!(engine.accept_suggestion(&mut editor, "ciao", false));
        assert_eq!(editor.text(), "Ciao  tutti");
        assert!(engine.auto_space_pending());
        assert!(engine.current_word().is_empty());
    }

    #[test]
    fn accepted_elision_keeps_word_open() {
        let mut engine = engine();
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "del");
        assert!(engine.accept_suggestion(&mut editor, "dell'", false));
        assert_eq!(editor.text(), "dell'");
        assert!(!engine.auto_space_pending());
        assert_eq!(engine.current_word(), "dell'");
    }

    #[test]
    fn undo_offers_word_for_dictionary() {
        let mut engine = engine();
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "teh");
        assert!(engine.on_boundary(' ', &mut editor).replaced);
        assert!(engine.on_backspace(&mut editor));
        assert_eq!(editor.text(), "teh");
        assert_eq!(engine.pending_add_word(), Some("teh"));
        assert_eq!(engine.current_word(), "teh");

        engine.add_user_word("teh");
        assert!(engine.pending_add_word().is_none());
        assert!(engine.store().is_known_word("teh"));
    }

    #[test]
    fn plain_backspace_edits_tracker() {
        let mut engine = engine();
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "ciaox");
        assert!(!engine.on_backspace(&mut editor));
        assert_eq!(engine.current_word(), "ciao");
    }

    #[test]
    fn disabling_suggestions_clears_list() {
        let mut engine = engine();
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "cia");
        assert!(!engine.suggestions().is_empty());
        let settings = SuggestionSettings {
            suggestions_enabled: false,
            ..SuggestionSettings::default()
        };
        engine.update_settings(settings);
        assert!(engine.suggestions().is_empty());
    }

    #[test]
    fn context_change_resets_session() {
        let mut engine = engine();
        let mut editor = MemoryEditor::new();
        type_into(&mut engine, &mut editor, "teh");
        engine.on_boundary(' ', &mut editor);
        engine.on_backspace(&mut editor);
        engine.on_context_changed();
        assert!(engine.pending_add_word().is_none());
        assert!(engine.current_word().is_empty());
        assert!(engine.suggestions().is_empty());
    }
}

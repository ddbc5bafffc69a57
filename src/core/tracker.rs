// File: src/core/tracker.rs
use crate::core::autoreplace::AutoSpaceMarker;
use crate::core::normalizer::{canonical_apostrophe, APOSTROPHE};
use crate::core::punctuation::Boundary;
use crate::host::TextEditor;
use log::debug;

pub const DEFAULT_MAX_WORD_LENGTH: usize = 48;

/// What happened to the tracked word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordEvent<'a> {
    Changed(&'a str),
    Reset,
}

pub trait WordObserver {
    fn on_word_event(&mut self, event: WordEvent<'_>);
}

impl<F: FnMut(WordEvent<'_>)> WordObserver for F {
    fn on_word_event(&mut self, event: WordEvent<'_>) {
        self(event)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WordObserver for NoopObserver {
    fn on_word_event(&mut self, _event: WordEvent<'_>) {}
}

/// Accumulates the word being typed since the last boundary.
///
/// Letters and digits extend the word, as does an apostrophe right after
/// one of them. Anything else ends it. The buffer keeps at most `max_len`
/// chars, dropping the oldest ones.
#[derive(Debug)]
pub struct WordTracker<O: WordObserver = NoopObserver> {
    current: String,
    chars: usize,
    max_len: usize,
    observer: O,
}

impl WordTracker<NoopObserver> {
    pub fn new(max_len: usize) -> Self {
        Self::with_observer(max_len, NoopObserver)
    }
}

impl<O: WordObserver> WordTracker<O> {
    pub fn with_observer(max_len: usize, observer: O) -> Self {
        Self {
            current: String::new(),
            chars: 0,
            max_len: max_len.max(1),
            observer,
        }
    }

    pub fn current_word(&self) -> &str {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len.max(1);
        while self.chars > self.max_len {
            self.drop_oldest();
        }
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Overwrites the buffer, e.g. after resynchronizing from surrounding text.
    pub fn set_word(&mut self, word: &str) {
        let count = word.chars().count();
        let skip = count.saturating_sub(self.max_len);
        let next: String = word.chars().skip(skip).collect();
        if next == self.current {
            return;
        }
        self.current = next;
        self.chars = count - skip;
        if self.current.is_empty() {
            self.observer.on_word_event(WordEvent::Reset);
        } else {
            debug!("[WordTracker] setWord '{}'", self.current);
            self.observer.on_word_event(WordEvent::Changed(&self.current));
        }
    }

    pub fn on_character_committed(&mut self, text: &str) {
        for ch in text.chars() {
            let c = canonical_apostrophe(ch);
            let after_word_char = self.current.chars().last().is_some_and(|last| last.is_alphanumeric());
            if c.is_alphanumeric() || (c == APOSTROPHE && after_word_char) {
                if self.chars >= self.max_len {
                    self.drop_oldest();
                }
                self.current.push(c);
                self.chars += 1;
                self.observer.on_word_event(WordEvent::Changed(&self.current));
            } else {
                self.reset();
            }
        }
    }

    pub fn on_backspace(&mut self) {
        if self.current.pop().is_none() {
            return;
        }
        self.chars -= 1;
        if self.current.is_empty() {
            self.observer.on_word_event(WordEvent::Reset);
        } else {
            self.observer.on_word_event(WordEvent::Changed(&self.current));
        }
    }

    /// Ends the word. A punctuation boundary following an engine-inserted
    /// space swaps that space for "<punctuation> "; any other boundary
    /// char is committed as-is.
    pub fn on_boundary_reached(
        &mut self,
        boundary: Option<Boundary>,
        editor: &mut dyn TextEditor,
        auto_space: &mut AutoSpaceMarker,
    ) {
        if let Some(b) = boundary {
            let c = b.as_char();
            if b.absorbs_auto_space() && auto_space.replace_with_punctuation(editor, c) {
                self.reset();
                return;
            }
            auto_space.clear();
            if !editor.commit_text(&c.to_string()) {
                log::warn!("[WordTracker] Host refused boundary '{}'", c.escape_default());
            }
        }
        self.reset();
    }

    pub fn on_cursor_moved(&mut self) {
        self.reset();
    }

    pub fn on_context_changed(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        if self.current.is_empty() {
            return;
        }
        debug!("[WordTracker] reset '{}'", self.current);
        self.current.clear();
        self.chars = 0;
        self.observer.on_word_event(WordEvent::Reset);
    }

    fn drop_oldest(&mut self) {
        if !self.current.is_empty() {
            self.current.remove(0);
            self.chars -= 1;
        }
    }
}

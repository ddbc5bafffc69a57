// File: src/host.rs
//! The text surface the engine edits. Hosts implement [`TextEditor`];
//! [`MemoryEditor`] backs the tests and the simulator binary.
//!
//! All counts are in chars, not bytes.

/// Key events the engine may synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Space,
    Enter,
    Delete,
}

pub trait TextEditor {
    fn text_before_cursor(&self, n: usize) -> Option<String>;
    fn text_after_cursor(&self, n: usize) -> Option<String>;
    /// Deletes `before` chars before and `after` chars after the cursor.
    fn delete_surrounding(&mut self, before: usize, after: usize) -> bool;
    /// Inserts `text` at the cursor and moves the cursor past it.
    fn commit_text(&mut self, text: &str) -> bool;
    fn begin_batch_edit(&mut self);
    fn end_batch_edit(&mut self);
    fn send_key_event(&mut self, event: KeyEvent) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEditor {
    text: Vec<char>,
    cursor: usize,
    batch_depth: usize,
    batches: usize,
    read_only: bool,
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor holding `text` with the cursor at the end.
    pub fn with_text(text: &str) -> Self {
        let text: Vec<char> = text.chars().collect();
        let cursor = text.len();
        Self {
            text,
            cursor,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.text.len());
    }

    /// Completed outermost batch edits so far.
    pub fn batch_count(&self) -> usize {
        self.batches
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Makes every mutating call fail, to exercise degraded paths.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Types text directly, as if the user produced it outside the engine.
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.text.insert(self.cursor, c);
            self.cursor += 1;
        }
    }
}

impl TextEditor for MemoryEditor {
    fn text_before_cursor(&self, n: usize) -> Option<String> {
        let start = self.cursor.saturating_sub(n);
        Some(self.text[start..self.cursor].iter().collect())
    }

    fn text_after_cursor(&self, n: usize) -> Option<String> {
        let end = (self.cursor + n).min(self.text.len());
        Some(self.text[self.cursor..end].iter().collect())
    }

    fn delete_surrounding(&mut self, before: usize, after: usize) -> bool {
        if self.read_only {
            return false;
        }
        let start = self.cursor.saturating_sub(before);
        let end = (self.cursor + after).min(self.text.len());
        self.text.drain(start..end);
        self.cursor = start;
        true
    }

    fn commit_text(&mut self, text: &str) -> bool {
        if self.read_only {
            return false;
        }
        self.type_text(text);
        true
    }

    fn begin_batch_edit(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch_edit(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.batches += 1;
        }
    }

    fn send_key_event(&mut self, event: KeyEvent) -> bool {
        match event {
            KeyEvent::Space => self.commit_text(" "),
            KeyEvent::Enter => self.commit_text("\n"),
            KeyEvent::Delete => {
                if self.cursor == 0 {
                    return false;
                }
                self.delete_surrounding(1, 0)
            }
        }
    }
}

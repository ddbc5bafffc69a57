use ime_core::core::dictionary::MemorySource;
use ime_core::core::punctuation::is_word_boundary;
use ime_core::core::types::{DictionaryEntry, Source};
use ime_core::host::{KeyEvent, MemoryEditor, TextEditor};
use ime_core::learning::MemoryUserDictionary;
use ime_core::{DictionaryConfig, DictionaryStore, SuggestionSettings, TypingEngine};
use std::sync::Arc;

fn session(words: &[(&str, u8)]) -> (TypingEngine, MemoryEditor) {
    let entries = words.iter().map(|(w, f)| DictionaryEntry::main(*w, *f)).collect();
    let store = Arc::new(DictionaryStore::new(
        MemorySource::new(entries),
        Arc::new(MemoryUserDictionary::new()),
        DictionaryConfig::default(),
    ));
    store.load_if_needed();
    (TypingEngine::new(store, SuggestionSettings::default()), MemoryEditor::new())
}

fn italian() -> (TypingEngine, MemoryEditor) {
    session(&[
        ("the", 255),
        ("then", 200),
        ("ciao", 250),
        ("come", 250),
        ("stai", 230),
        ("perché", 220),
        ("amico", 180),
        ("hallo", 100),
    ])
}

/// Types like a keyboard: word chars are committed by the host, boundaries
/// go to the engine.
fn type_keys(engine: &mut TypingEngine, editor: &mut MemoryEditor, text: &str) {
    for c in text.chars() {
        let prev = editor.text_before_cursor(1).and_then(|t| t.chars().last());
        if is_word_boundary(c, prev) {
            engine.on_boundary(c, editor);
        } else {
            editor.commit_text(&c.to_string());
            engine.on_character_committed(&c.to_string());
        }
    }
}

fn backspace(engine: &mut TypingEngine, editor: &mut MemoryEditor) {
    if !engine.on_backspace(editor) {
        editor.send_key_event(KeyEvent::Delete);
    }
}

#[test]
fn typo_is_replaced_then_undone_and_remembered() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "teh ");
    assert_eq!(editor.text(), "the ");

    backspace(&mut engine, &mut editor);
    assert_eq!(editor.text(), "teh");
    assert_eq!(engine.pending_add_word(), Some("teh"));

    type_keys(&mut engine, &mut editor, " ");
    assert_eq!(editor.text(), "teh ");

    // Same typo later in the session stays rejected.
    type_keys(&mut engine, &mut editor, "teh ");
    assert_eq!(editor.text(), "teh teh ");
}

#[test]
fn punctuation_absorbs_engine_space() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "ciao teh,");
    assert_eq!(editor.text(), "ciao the,");

    type_keys(&mut engine, &mut editor, " teh");
    type_keys(&mut engine, &mut editor, " ");
    assert_eq!(editor.text(), "ciao the, the ");
    type_keys(&mut engine, &mut editor, "!");
    assert_eq!(editor.text(), "ciao the, the! ");
}

#[test]
fn user_typed_space_is_not_absorbed() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "ciao .");
    assert_eq!(editor.text(), "ciao .");
}

#[test]
fn accent_fix_and_casing() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "Perche ");
    assert_eq!(editor.text(), "Perché ");
    type_keys(&mut engine, &mut editor, "TEH ");
    assert_eq!(editor.text(), "Perché THE ");
}

#[test]
fn suggestions_follow_the_current_word() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "co");
    assert_eq!(engine.suggestions().first().map(|s| s.candidate.as_str()), Some("come"));
    type_keys(&mut engine, &mut editor, "m");
    assert_eq!(engine.current_word(), "com");
    type_keys(&mut engine, &mut editor, " ");
    assert!(engine.suggestions().is_empty());
}

#[test]
fn accepting_a_suggestion_completes_the_word() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "come st");
    let pick = engine.suggestions().first().map(|s| s.candidate.clone()).unwrap();
    assert_eq!(pick, "stai");
    assert!(engine.accept_suggestion(&mut editor, &pick, false));
    assert_eq!(editor.text(), "come stai ");
    type_keys(&mut engine, &mut editor, "?");
    assert_eq!(editor.text(), "come stai? ");
}

#[test]
fn user_words_win_and_are_never_corrected() {
    let (mut engine, mut editor) = italian();
    engine.add_user_word("hallx");
    type_keys(&mut engine, &mut editor, "hall");
    let first = engine.suggestions().first().cloned().unwrap();
    assert_eq!(first.candidate, "hallx");
    assert_eq!(first.source, Source::User);

    type_keys(&mut engine, &mut editor, "x ");
    assert_eq!(editor.text(), "hallx ");

    assert!(engine.remove_user_word("hallx"));
    assert!(!engine.store().is_known_word("hallx"));
}

#[test]
fn cursor_move_resyncs_and_blocks_undo() {
    let (mut engine, mut editor) = italian();
    type_keys(&mut engine, &mut editor, "teh ");
    assert_eq!(editor.text(), "the ");
    editor.set_cursor(2);
    engine.on_cursor_moved(&editor);
    assert_eq!(engine.current_word(), "the");

    editor.set_cursor(4);
    engine.on_cursor_moved(&editor);
    assert!(!engine.on_backspace(&mut editor));
}

#[test]
fn disabled_auto_replace_leaves_text() {
    let (mut engine, mut editor) = italian();
    let mut settings = SuggestionSettings::default();
    settings.apply("auto_replace_enabled", "false").unwrap();
    engine.update_settings(settings);
    type_keys(&mut engine, &mut editor, "teh ");
    assert_eq!(editor.text(), "teh ");
}

#[test]
fn empty_dictionary_degrades_quietly() {
    let (mut engine, mut editor) = session(&[]);
    type_keys(&mut engine, &mut editor, "qualcosa di nuovo.");
    assert_eq!(editor.text(), "qualcosa di nuovo.");
    assert!(engine.suggestions().is_empty());
}

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use ime_core::core::dictionary::{DictionarySource, MemorySource};
use ime_core::core::punctuation::is_word_boundary;
use ime_core::core::types::DictionaryEntry;
use ime_core::host::{KeyEvent, MemoryEditor, TextEditor};
use ime_core::learning::{MemoryUserDictionary, UserDictionaryStore};
use ime_core::persistence::{JsonDictionarySource, JsonUserDictionary};
use ime_core::{DictionaryConfig, DictionaryStore, SuggestionSettings, TypingEngine};
use std::env;
use std::io::{stdin, stdout, Write};
use std::path::Path;
use std::sync::Arc;

const SETTINGS_PATH: &str = "ime_settings.toml";

const SAMPLE_WORDS: &[(&str, u8)] = &[
    ("the", 255),
    ("then", 210),
    ("there", 200),
    ("ciao", 240),
    ("casa", 230),
    ("perché", 220),
    ("città", 200),
    ("amico", 190),
    ("dell'", 210),
    ("l'", 230),
    ("acqua", 180),
];

fn main() {
    env_logger::init();

    // ime_engine [dictionary.json] [user_words.json]
    let args: Vec<String> = env::args().skip(1).collect();
    let source: Box<dyn DictionarySource> = match args.first() {
        Some(path) => Box::new(JsonDictionarySource::new(path)),
        None => Box::new(MemorySource::new(
            SAMPLE_WORDS.iter().map(|(w, f)| DictionaryEntry::main(*w, *f)).collect(),
        )),
    };
    let user_store: Arc<dyn UserDictionaryStore> = match args.get(1).map(|p| JsonUserDictionary::open(p)) {
        Some(Ok(store)) => Arc::new(store),
        Some(Err(e)) => {
            eprintln!("{} could not open user dictionary: {}", "[ERROR]".red(), e);
            Arc::new(MemoryUserDictionary::new())
        }
        None => Arc::new(MemoryUserDictionary::new()),
    };
    let mut settings = SuggestionSettings::load(Path::new(SETTINGS_PATH)).unwrap_or_else(|e| {
        eprintln!("{} bad settings file: {}", "[ERROR]".red(), e);
        SuggestionSettings::default()
    });

    let store = Arc::new(DictionaryStore::new(BoxedSource(source), user_store, DictionaryConfig::default()));
    store.load_if_needed();
    let mut engine = TypingEngine::new(store, settings.clone());
    let mut editor = MemoryEditor::new();
    let mut status = String::new();

    loop {
        print_ui(&engine, &editor, &status);
        status.clear();

        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = input.trim_end_matches(['\n', '\r']);

        match line {
            "exit" => break,
            "<" => {
                if engine.on_backspace(&mut editor) {
                    status = "undo".to_string();
                } else {
                    editor.send_key_event(KeyEvent::Delete);
                }
            }
            "add" => match engine.pending_add_word().map(str::to_string) {
                Some(word) => {
                    engine.add_user_word(&word);
                    status = format!("added '{}'", word);
                }
                None => status = "nothing to add".to_string(),
            },
            s if s.starts_with(':') && s.len() > 1 => {
                let choice = s[1..].parse::<usize>().ok().and_then(|n| engine.suggestions().get(n.wrapping_sub(1)));
                match choice.map(|c| c.candidate.clone()) {
                    Some(word) => {
                        engine.accept_suggestion(&mut editor, &word, false);
                    }
                    None => status = "no such suggestion".to_string(),
                }
            }
            s if s.starts_with("set ") => {
                let mut parts = s[4..].splitn(2, ' ');
                let (key, value) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
                match settings.apply(key, value) {
                    Ok(()) => {
                        engine.update_settings(settings.clone());
                        if let Err(e) = settings.save(Path::new(SETTINGS_PATH)) {
                            status = format!("not saved: {}", e);
                        }
                    }
                    Err(e) => status = e.to_string(),
                }
            }
            s if s.starts_with('+') && s.len() > 1 => {
                engine.add_user_word(&s[1..]);
            }
            s if s.starts_with('-') && s.len() > 1 => {
                if !engine.remove_user_word(&s[1..]) {
                    status = format!("'{}' is not a user word", &s[1..]);
                }
            }
            s => type_line(&mut engine, &mut editor, s, &mut status),
        }
    }
}

/// Feeds typed text one key at a time, the way a keyboard would.
fn type_line(engine: &mut TypingEngine, editor: &mut MemoryEditor, text: &str, status: &mut String) {
    for c in text.chars() {
        let prev = editor.text_before_cursor(1).and_then(|t| t.chars().last());
        if is_word_boundary(c, prev) {
            let outcome = engine.on_boundary(c, editor);
            if outcome.replaced {
                *status = "auto-replaced (send '<' to undo)".to_string();
            }
        } else {
            let key = c.to_string();
            editor.commit_text(&key);
            engine.on_character_committed(&key);
        }
    }
}

fn print_ui(engine: &TypingEngine, editor: &MemoryEditor, status: &str) {
    let mut out = stdout();
    let _ = execute!(out, Clear(ClearType::All), MoveTo(0, 0));
    println!("{}", "Typing assistant simulator".bold());
    println!("---------------------------------------------------------------");
    println!("Type text; space and punctuation end a word. '<' deletes,");
    println!("':1' picks a suggestion, '+w'/'-w' edit user words, 'add' keeps");
    println!("an undone word, 'set key value' changes settings, 'exit' quits.\n");

    println!("Text:  [{}{}]", editor.text(), "|".dark_grey());
    println!("Word:  [{}]", engine.current_word().cyan());

    if engine.suggestions().is_empty() {
        println!("\nNo suggestions.");
    } else {
        println!("\nSuggestions:");
        for (i, s) in engine.suggestions().iter().enumerate() {
            println!(
                "  :{}: {} (d={}, score {:.2}, {:?})",
                i + 1,
                s.candidate.as_str().green(),
                s.edit_distance,
                s.score,
                s.source
            );
        }
    }
    if let Some(word) = engine.pending_add_word() {
        println!("\n'add' to keep '{}' in your dictionary", word.yellow());
    }
    if !status.is_empty() {
        println!("\n{}", status.magenta());
    }
    print!("\n> ");
    let _ = out.flush();
}

/// Lets the binary pick its dictionary source at runtime.
struct BoxedSource(Box<dyn DictionarySource>);

impl DictionarySource for BoxedSource {
    fn load(&self) -> ime_core::Result<ime_core::core::dictionary::BaseDictionary> {
        self.0.load()
    }

    fn describe(&self) -> String {
        self.0.describe()
    }
}

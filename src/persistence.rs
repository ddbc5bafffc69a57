// File: src/persistence.rs
use crate::core::dictionary::{BaseDictionary, DictionarySource, DictionaryStore};
use crate::core::types::{DictionaryEntry, Source, MAX_RAW_FREQUENCY};
use crate::error::Result;
use crate::fuzzy::SerializedIndex;
use crate::learning::{LearningEngine, UserDictionaryStore, UserEntry};
use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One `{ "w": word, "f": frequency }` record of a dictionary asset.
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    w: String,
    #[serde(default = "default_raw_frequency")]
    f: i64,
}

fn default_raw_frequency() -> i64 {
    1
}

impl RawEntry {
    fn into_entry(self, source: Source) -> Option<DictionaryEntry> {
        let word = self.w.trim();
        if word.is_empty() {
            return None;
        }
        let frequency = self.f.clamp(0, i64::from(MAX_RAW_FREQUENCY)) as u8;
        Some(DictionaryEntry::new(word, frequency, source))
    }
}

/// Parses a JSON word list. Blank words are skipped, a missing frequency
/// counts as 1 and out-of-range ones are clamped to 0..=255.
pub fn parse_json_entries(json: &str, source: Source) -> Result<Vec<DictionaryEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(json)?;
    Ok(raw.into_iter().filter_map(|r| r.into_entry(source)).collect())
}

pub fn load_json_entries(path: &Path, source: Source) -> Result<Vec<DictionaryEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let raw: Vec<RawEntry> = serde_json::from_reader(reader)?;
    Ok(raw.into_iter().filter_map(|r| r.into_entry(source)).collect())
}

/// Writes `contents` next to `path` first and renames it into place, so a
/// crash never leaves a half-written file behind.
fn write_atomically(path: &Path, write: impl FnOnce(&mut BufWriter<&NamedTempFile>) -> Result<()>) -> Result<()> {
    let parent_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;
    let temp_file = NamedTempFile::new_in(parent_dir)?;
    let mut writer = BufWriter::new(&temp_file);
    write(&mut writer)?;
    // A failed flush must not reach the rename below.
    writer.flush()?;
    drop(writer);
    temp_file.persist(path)?;
    Ok(())
}

/// Base dictionary read from a JSON asset, with an optional file of
/// USER-tagged default words next to it.
#[derive(Debug, Clone)]
pub struct JsonDictionarySource {
    path: PathBuf,
    user_defaults: Option<PathBuf>,
}

impl JsonDictionarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user_defaults: None,
        }
    }

    pub fn with_user_defaults(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_defaults = Some(path.into());
        self
    }
}

impl DictionarySource for JsonDictionarySource {
    fn load(&self) -> Result<BaseDictionary> {
        let entries = load_json_entries(&self.path, Source::Main)?;
        let user_defaults = match &self.user_defaults {
            Some(path) => load_json_entries(path, Source::User).unwrap_or_else(|e| {
                warn!("[Persistence] Ignoring default user words {}: {}", path.display(), e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        Ok(BaseDictionary {
            entries,
            user_defaults,
            serialized: None,
        })
    }

    fn describe(&self) -> String {
        format!("json {}", self.path.display())
    }
}

/// Precomputed dictionary: the MAIN entries plus their fuzzy index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedDictionary {
    pub entries: Vec<DictionaryEntry>,
    pub index: SerializedIndex,
}

impl SerializedDictionary {
    /// Snapshot of what a loaded store currently indexes.
    pub fn from_store(store: &DictionaryStore) -> Self {
        Self {
            entries: store.main_entries(),
            index: store.export_serialized(),
        }
    }
}

pub fn save_serialized_dictionary(dictionary: &SerializedDictionary, path: &Path) -> Result<()> {
    write_atomically(path, |writer| Ok(bincode::serialize_into(&mut *writer, dictionary)?))?;
    info!(
        "[Persistence] Wrote {} entries to {}",
        dictionary.entries.len(),
        path.display()
    );
    Ok(())
}

pub fn load_serialized_dictionary(path: &Path) -> Result<SerializedDictionary> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Base dictionary read from a bincode bundle written by
/// [`save_serialized_dictionary`].
#[derive(Debug, Clone)]
pub struct BincodeDictionarySource {
    path: PathBuf,
}

impl BincodeDictionarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DictionarySource for BincodeDictionarySource {
    fn load(&self) -> Result<BaseDictionary> {
        let SerializedDictionary { entries, index } = load_serialized_dictionary(&self.path)?;
        Ok(BaseDictionary {
            entries,
            user_defaults: Vec::new(),
            serialized: Some(index),
        })
    }

    fn describe(&self) -> String {
        format!("bincode {}", self.path.display())
    }
}

/// User dictionary kept in a JSON file, rewritten after every change.
pub struct JsonUserDictionary {
    path: PathBuf,
    words: Mutex<BTreeMap<String, UserEntry>>,
    learning_engine: LearningEngine,
}

impl JsonUserDictionary {
    /// Opens the store at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            load_json_entries(&path, Source::User)?
        } else {
            Vec::new()
        };
        let words = entries
            .into_iter()
            .map(|e| {
                (
                    e.word.to_lowercase(),
                    UserEntry {
                        word: e.word,
                        frequency: e.frequency,
                    },
                )
            })
            .collect();
        Ok(Self {
            path,
            words: Mutex::new(words),
            learning_engine: LearningEngine::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, words: &BTreeMap<String, UserEntry>) -> Result<()> {
        let raw: Vec<RawEntry> = words
            .values()
            .map(|e| RawEntry {
                w: e.word.clone(),
                f: i64::from(e.frequency),
            })
            .collect();
        write_atomically(&self.path, |writer| Ok(serde_json::to_writer_pretty(&mut *writer, &raw)?))
    }

    fn persist(&self, words: &BTreeMap<String, UserEntry>) {
        if let Err(e) = self.save(words) {
            warn!("[Persistence] Could not save user dictionary {}: {}", self.path.display(), e);
        }
    }
}

impl UserDictionaryStore for JsonUserDictionary {
    fn entries(&self) -> Vec<UserEntry> {
        self.words.lock().values().cloned().collect()
    }

    fn add_word(&self, word: &str) -> Option<UserEntry> {
        let mut words = self.words.lock();
        let entry = self.learning_engine.learn(&mut words, word, true)?;
        self.persist(&words);
        Some(entry)
    }

    fn remove_word(&self, word: &str) -> bool {
        let mut words = self.words.lock();
        let removed = words.remove(&word.trim().to_lowercase()).is_some();
        if removed {
            self.persist(&words);
        }
        removed
    }

    fn mark_used(&self, word: &str) -> Option<UserEntry> {
        let mut words = self.words.lock();
        let entry = self.learning_engine.learn(&mut words, word, false)?;
        self.persist(&words);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DictionaryConfig;
    use crate::learning::MemoryUserDictionary;
    use std::sync::Arc;

    #[test]
    fn json_entries_default_and_clamp() {
        let entries = parse_json_entries(
            r#"[{"w":"ciao","f":300},{"w":"casa"},{"w":"  "},{"w":"rara","f":-4}]"#,
            Source::Main,
        )
        .unwrap();
        let pairs: Vec<(&str, u8)> = entries.iter().map(|e| (e.word.as_str(), e.frequency)).collect();
        assert_eq!(pairs, [("ciao", 255), ("casa", 1), ("rara", 0)]);
        assert!(parse_json_entries("{", Source::Main).is_err());
    }

    #[test]
    fn atomic_write_flushes_or_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        fs::write(&path, "old").unwrap();

        let failed = write_atomically(&path, |writer| {
            writer.write_all(b"partial")?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
        });
        assert!(failed.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        // Still sitting in the buffer when the closure returns.
        write_atomically(&path, |writer| Ok(writer.write_all(b"new contents")?)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new contents");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn json_source_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("it_base.json");
        let defaults = dir.path().join("defaults.json");
        fs::write(&main, r#"[{"w":"ciao","f":200}]"#).unwrap();
        fs::write(&defaults, r#"[{"w":"Pastiera","f":5}]"#).unwrap();

        let base = JsonDictionarySource::new(&main).with_user_defaults(&defaults).load().unwrap();
        assert_eq!(base.entries, vec![DictionaryEntry::main("ciao", 200)]);
        assert_eq!(base.user_defaults, vec![DictionaryEntry::user("Pastiera", 5)]);

        let missing = JsonDictionarySource::new(dir.path().join("nope.json"));
        assert!(missing.load().is_err());
    }

    #[test]
    fn serialized_dictionary_feeds_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("it.dict");

        let source = crate::core::dictionary::MemorySource::new(vec![
            DictionaryEntry::main("ciao", 255),
            DictionaryEntry::main("casa", 200),
        ]);
        let store = DictionaryStore::new(source, Arc::new(MemoryUserDictionary::new()), DictionaryConfig::default());
        store.load_if_needed();
        save_serialized_dictionary(&SerializedDictionary::from_store(&store), &path).unwrap();

        let reloaded = DictionaryStore::new(
            BincodeDictionarySource::new(&path),
            Arc::new(MemoryUserDictionary::new()),
            DictionaryConfig::default(),
        );
        reloaded.load_if_needed();
        assert!(reloaded.is_known_word("casa"));
        let hits = reloaded.fuzzy_lookup("cssa", 3);
        assert_eq!(hits.first().map(|h| h.term.as_str()), Some("casa"));
    }

    #[test]
    fn user_dictionary_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user").join("words.json");
        {
            let store = JsonUserDictionary::open(&path).unwrap();
            assert!(store.entries().is_empty());
            store.add_word("Pastiera");
            store.add_word("sfogliatella");
            store.mark_used("pastiera");
            assert!(store.remove_word("sfogliatella"));
        }
        let store = JsonUserDictionary::open(&path).unwrap();
        assert_eq!(
            store.entries(),
            vec![UserEntry {
                word: "Pastiera".to_string(),
                frequency: 2
            }]
        );
    }
}

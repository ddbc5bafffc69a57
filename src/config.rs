// File: src/config.rs
use crate::core::casing::CaseLocale;
use crate::core::keyboard::KeyboardLayout;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// User-facing switches for suggestions and auto-replacement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SuggestionSettings {
    #[serde(default = "default_true")]
    pub auto_replace_enabled: bool,
    #[serde(default = "default_max_auto_replace_distance")]
    pub max_auto_replace_distance: usize,
    #[serde(default = "default_true")]
    pub suggestions_enabled: bool,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_true")]
    pub accent_matching: bool,
    #[serde(default = "default_true")]
    pub keyboard_proximity: bool,
    #[serde(default = "default_true")]
    pub edit_type_ranking: bool,
    #[serde(default)]
    pub keyboard_layout: KeyboardLayout,
    #[serde(default = "default_max_word_length")]
    pub max_word_length: usize,
}

/// How the dictionary is indexed. Fixed for the lifetime of a store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DictionaryConfig {
    /// Longest prefix with its own completion bucket.
    #[serde(default = "default_cache_prefix_length")]
    pub cache_prefix_length: usize,
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: usize,
    /// Chars of each word that take part in delete generation.
    #[serde(default = "default_fuzzy_prefix_length")]
    pub fuzzy_prefix_length: usize,
    #[serde(default)]
    pub case_locale: CaseLocale,
}

fn default_true() -> bool {
    true
}

fn default_max_auto_replace_distance() -> usize {
    1
}

fn default_max_suggestions() -> usize {
    3
}

fn default_max_word_length() -> usize {
    48
}

fn default_cache_prefix_length() -> usize {
    4
}

fn default_max_edit_distance() -> usize {
    2
}

fn default_fuzzy_prefix_length() -> usize {
    7
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            auto_replace_enabled: default_true(),
            max_auto_replace_distance: default_max_auto_replace_distance(),
            suggestions_enabled: default_true(),
            max_suggestions: default_max_suggestions(),
            accent_matching: default_true(),
            keyboard_proximity: default_true(),
            edit_type_ranking: default_true(),
            keyboard_layout: KeyboardLayout::default(),
            max_word_length: default_max_word_length(),
        }
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            cache_prefix_length: default_cache_prefix_length(),
            max_edit_distance: default_max_edit_distance(),
            fuzzy_prefix_length: default_fuzzy_prefix_length(),
            case_locale: CaseLocale::default(),
        }
    }
}

impl SuggestionSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let settings = Self::from_toml_str(&contents)?;
                log::info!("[Config] Settings loaded from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[Config] No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Applies one value from an abstract key/value settings surface.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || Error::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        match key {
            "auto_replace_enabled" => self.auto_replace_enabled = parse(value).ok_or_else(invalid)?,
            "max_auto_replace_distance" => self.max_auto_replace_distance = parse(value).ok_or_else(invalid)?,
            "suggestions_enabled" => self.suggestions_enabled = parse(value).ok_or_else(invalid)?,
            "max_suggestions" => self.max_suggestions = parse(value).ok_or_else(invalid)?,
            "accent_matching" => self.accent_matching = parse(value).ok_or_else(invalid)?,
            "keyboard_proximity" => self.keyboard_proximity = parse(value).ok_or_else(invalid)?,
            "edit_type_ranking" => self.edit_type_ranking = parse(value).ok_or_else(invalid)?,
            "keyboard_layout" => self.keyboard_layout = parse(value).ok_or_else(invalid)?,
            "max_word_length" => {
                let len: usize = parse(value).ok_or_else(invalid)?;
                if len == 0 {
                    return Err(invalid());
                }
                self.max_word_length = len;
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }
}

impl DictionaryConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

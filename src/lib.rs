// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod fuzzy;
pub mod host;
pub mod learning;
pub mod persistence;

pub use crate::config::{DictionaryConfig, SuggestionSettings};
pub use crate::core::dictionary::DictionaryStore;
pub use crate::core::engine::TypingEngine;
pub use crate::error::{Error, Result};

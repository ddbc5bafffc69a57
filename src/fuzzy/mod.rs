// File: src/fuzzy/mod.rs
pub mod distance;
pub mod symspell;

pub use symspell::{FuzzyIndex, SerializedIndex, SuggestItem};

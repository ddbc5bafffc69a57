// File: src/core/mod.rs
pub mod autoreplace;
pub mod casing;
pub mod dictionary;
pub mod engine;
pub mod keyboard;
pub mod normalizer;
pub mod punctuation;
pub mod ranker;
pub mod tracker;
pub mod types;

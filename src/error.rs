// File: src/error.rs

/// Errors surfaced by the I/O edges of the engine: dictionary assets,
/// serialized indices, user dictionary files and settings.
///
/// The keystroke path never produces these; it logs and degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Settings parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Settings encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },

    #[error("Atomic write failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

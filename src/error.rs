//! Error types for storage, export and CLI plumbing.
//!
//! The pattern engine and the session controller never fail: invalid calls are
//! guarded no-ops. Errors only come from the I/O around them.

#[derive(Debug, thiserror::Error)]
pub enum PatlockError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Pattern {key} has fewer than {min} dots and can never unlock a device")]
    TooShort { key: String, min: usize },

    #[error("Refusing to clear history without confirmation (pass --yes)")]
    Unconfirmed,

    #[error("Could not resolve a state directory; pass --state-file")]
    StateDirUnavailable,
}

pub type Result<T> = std::result::Result<T, PatlockError>;

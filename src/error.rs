use thiserror::Error;

/// Error taxonomy for the store and the lifecycle engine.
///
/// `Corrupt` is internal: `Store::load` converts it into a backup restore
/// and only surfaces `StoreUnavailable` when no valid backup exists either.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input to a mutation. State unchanged.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation referenced a nonexistent task or category id. State unchanged.
    #[error("not found: {0}")]
    NotFound(String),

    /// A snapshot failed parsing or structural validation.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// No valid primary snapshot and no valid backup. Fatal to the load.
    #[error("store unavailable: primary snapshot is corrupt and no valid backup exists")]
    StoreUnavailable,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

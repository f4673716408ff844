use cidgate_types::ParseError;

/// Errors from content store calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The namespace path (or source content) does not exist.
    #[error("file does not exist: {0}")]
    NotFound(String),

    /// The destination path is already occupied.
    #[error("directory already has entry by that name: {0}")]
    AlreadyExists(String),

    /// The path is malformed or names the wrong kind of entry.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store answered with an error of its own.
    #[error("store returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The request never produced a response.
    #[error("store request failed: {0}")]
    Transport(String),

    /// The store answered with a body we could not decode.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    /// The store reported an identifier that does not parse.
    #[error("store returned an invalid CID: {0}")]
    InvalidCid(#[from] ParseError),

    /// Client construction failed (bad URL, bad header).
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns `true` for the "does not exist" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

use thiserror::Error;

/// Canonical error type for the storage core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity was not found in the document store.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"indicator"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Optimistic write lost a revision race.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable description of the conflicting write.
        message: String,
    },

    /// Input payload is malformed or not serializable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Encrypt/decrypt failure: wrong key, malformed ciphertext, or
    /// non-JSON plaintext after decryption.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Document store backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error occurred.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Conflict` variant.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a `Validation` variant.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an `Encryption` variant.
    #[must_use]
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() || err.is_syntax() || err.is_data() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

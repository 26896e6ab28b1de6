use std::path::Path;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by the durable layer regardless of which file failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying filesystem operation failed.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the layer was doing when the fault occurred.
        message: String,
        /// The I/O fault itself.
        #[source]
        source: std::io::Error,
    },
    /// A store file exists but cannot be parsed.
    #[error("corrupt store file `{path}`: {message}")]
    Corrupt {
        /// Offending file.
        path: String,
        /// Parse failure detail.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from a filesystem failure.
    pub fn unavailable(message: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source,
        }
    }

    /// Construct a corruption error for `path`.
    pub fn corrupt(path: &Path, message: impl ToString) -> Self {
        StorageError::Corrupt {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

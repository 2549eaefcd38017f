use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by progress store backends regardless of the underlying database.
///
/// Every variant means the requested operation did not take effect: writes are
/// either applied atomically or not at all.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("stored record is malformed: {message}")]
    Malformed { message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an error for a record that cannot be mapped onto the domain model.
    pub fn malformed(message: impl Into<String>) -> Self {
        StorageError::Malformed {
            message: message.into(),
        }
    }
}

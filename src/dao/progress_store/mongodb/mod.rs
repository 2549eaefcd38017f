mod config;
mod error;
mod models;
/// Store implementation over the driver.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoProgressStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Malformed { .. } => StorageError::malformed(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

/// Persistence model definitions.
pub mod models;
/// Progress store abstraction and its backends.
pub mod progress_store;
/// Storage error types shared by every backend.
pub mod storage;

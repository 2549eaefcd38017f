//! Library crate for hunt-board: scan validation, progress advancing and the
//! live leaderboard, exposed for the server binary and integration tests.

/// Runtime configuration.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Error types and their HTTP mapping.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Application logic.
pub mod services;
/// Shared state and coordination primitives.
pub mod state;

/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle: start, end, reset and status.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Leaderboard composition, publishing and the background refresher.
pub mod leaderboard_service;
/// Scan handling: validation and the conditional progress write.
pub mod progress_service;
/// Constant-time comparison of scan codes.
pub mod scan_validator;
/// Server-Sent Events adaptation of hub subscriptions.
pub mod sse_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;

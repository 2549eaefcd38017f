use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document served at `/api-doc/openapi.json`.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scan::scan_code,
        crate::routes::leaderboard::leaderboard,
        crate::routes::sse::leaderboard_stream,
        crate::routes::game::game_status,
        crate::routes::game::start_game,
        crate::routes::game::end_game,
        crate::routes::game::reset_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::scan::ScanRequest,
            crate::dto::scan::ScanResponse,
            crate::dto::scan::ScanOutcomeKind,
            crate::dto::scan::GroupProgress,
            crate::dto::game::GameStatusResponse,
            crate::dto::game::ActionResponse,
            crate::state::leaderboard::LeaderboardSnapshot,
            crate::state::leaderboard::LeaderboardEntry,
            crate::state::leaderboard::Badge,
            crate::dao::models::Pathway,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "groups", description = "Checkpoint scans"),
        (name = "leaderboard", description = "Leaderboard snapshots and live stream"),
        (name = "admin", description = "Game lifecycle management"),
    )
)]
pub struct ApiDoc;

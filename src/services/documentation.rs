use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Pollamanía back-end.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::fixtures::list_leagues,
        crate::routes::fixtures::get_fixtures,
        crate::routes::session::login,
        crate::routes::session::logout,
        crate::routes::session::get_profile,
        crate::routes::session::update_profile,
        crate::routes::pools::list_pools,
        crate::routes::pools::create_pool,
        crate::routes::pools::get_pool,
        crate::routes::pools::update_pool,
        crate::routes::pools::delete_pool,
        crate::routes::pools::add_member,
        crate::routes::pools::remove_member,
        crate::routes::pools::pool_matches,
        crate::routes::pools::list_predictions,
        crate::routes::pools::list_user_predictions,
        crate::routes::pools::submit_prediction,
        crate::routes::pools::standings,
        crate::routes::catalog::create_tournament,
        crate::routes::catalog::list_tournaments,
        crate::routes::catalog::get_tournament,
        crate::routes::catalog::create_match,
        crate::routes::catalog::list_matches,
        crate::routes::catalog::get_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::fixture::MatchResponse,
            crate::dto::fixture::FixturesResponse,
            crate::dto::fixture::MatchDayResponse,
            crate::dto::fixture::PoolMatchesResponse,
            crate::dto::session::LoginRequest,
            crate::dto::session::UpdateProfileRequest,
            crate::dto::session::ProfileResponse,
            crate::dto::pool::CreatePoolRequest,
            crate::dto::pool::UpdatePoolRequest,
            crate::dto::pool::AddMemberRequest,
            crate::dto::pool::PoolResponse,
            crate::dto::pool::PoolListResponse,
            crate::dto::pool::PoolDetailResponse,
            crate::dto::prediction::SubmitPredictionRequest,
            crate::dto::prediction::PredictionResponse,
            crate::dto::prediction::SubmissionResponse,
            crate::dto::standings::StandingsResponse,
            crate::dto::catalog::CreateTournamentRequest,
            crate::dto::catalog::TournamentResponse,
            crate::dto::catalog::MatchResultDto,
            crate::dto::catalog::CreateCatalogMatchRequest,
            crate::dto::catalog::CatalogMatchResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::PoolChangedEvent,
            crate::dto::sse::PoolDeletedEvent,
            crate::dto::sse::PredictionSubmittedEvent,
            crate::dto::sse::MatchStatusEvent,
            crate::dto::sse::MatchLockedEvent,
            crate::dto::sse::StandingsInvalidatedEvent,
            crate::dto::sse::FixtureRejectedEvent,
            crate::state::league::League,
            crate::state::league::LeagueInfo,
            crate::state::fixture::MatchStatus,
            crate::state::fixture::Score,
            crate::state::pool::PoolStatus,
            crate::state::pool::PoolFilter,
            crate::state::standings::ScoringPolicy,
            crate::state::standings::StandingEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "fixtures", description = "Leagues and cached fixtures"),
        (name = "session", description = "Session context of the signed-in user"),
        (name = "pools", description = "Pools, predictions and standings"),
        (name = "catalog", description = "Companion tournament and match catalog"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_prediction_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/pools/{id}/predictions/{match_id}"));
        assert!(doc.paths.paths.contains_key("/api/match/{id}"));
    }
}

/// Companion tournament/match catalog.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// League fixtures, provider refreshes and the background refresher.
pub mod fixture_service;
/// Health check service.
pub mod health_service;
/// Pool lifecycle, membership and local cache synchronisation.
pub mod pool_service;
/// Prediction ledger.
pub mod prediction_service;
/// Session context and profiles.
pub mod session_service;
/// Local JSON snapshot persistence.
pub mod snapshot_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Pool leaderboards.
pub mod standings_service;
/// Remote store connection supervisor.
pub mod storage_supervisor;

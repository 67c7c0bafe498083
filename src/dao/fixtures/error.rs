use reqwest::StatusCode;
use thiserror::Error;

use crate::state::league::League;

/// Failures while pulling fixtures from the provider.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The league is missing from the mapping table.
    #[error("league `{0}` has no provider mapping")]
    UnknownLeague(League),
    /// Building the HTTP client failed.
    #[error("failed to build fixtures client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request did not complete in time.
    #[error("fixtures provider timed out")]
    Timeout,
    /// The request could not be sent or the connection dropped.
    #[error("failed to reach fixtures provider at `{url}`")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with a non-success status.
    #[error("fixtures provider answered {status} for `{url}`")]
    Status { url: String, status: StatusCode },
    /// The body did not match the expected shape.
    #[error("failed to decode fixtures from `{url}`")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

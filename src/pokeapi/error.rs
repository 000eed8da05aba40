use thiserror::Error;

/// Errors raised by the upstream API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The upstream returned 404 for a named lookup. Callers map this to an
    /// empty result rather than a failure.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// Any other non-success HTTP status.
    #[error("upstream request failed with status {0}")]
    Status(reqwest::StatusCode),
    /// Transport failure or a body that does not decode as the expected
    /// shape; reqwest reports both through its error type.
    #[error("request error")]
    Request(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

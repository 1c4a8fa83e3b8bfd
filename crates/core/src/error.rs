use thiserror::Error;

pub type CfoResult<T> = Result<T, CfoError>;

#[derive(Error, Debug)]
pub enum CfoError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Completion error: {0}")]
    CompletionFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CfoError {
    /// Classification code reported to API callers. Everything that is not an
    /// input, authorization or lookup problem collapses to `internal`.
    pub fn code(&self) -> &'static str {
        match self {
            CfoError::Unauthorized(_) => "unauthorized",
            CfoError::InvalidInput(_) => "invalid_input",
            CfoError::NotFound(_) => "not_found",
            _ => "internal",
        }
    }

    /// Errors whose message is safe to hand back to the caller verbatim.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CfoError::Unauthorized(_) | CfoError::InvalidInput(_) | CfoError::NotFound(_)
        )
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
/// Failure taxonomy for dashboard backend calls.
pub enum ApiError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Normalizes a non-success response; 401/403 collapse into
    /// `NotAuthenticated` so callers see one authentication failure kind.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 401 || status == 403 {
            return Self::NotAuthenticated;
        }
        Self::HttpStatus { status, body }
    }

    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

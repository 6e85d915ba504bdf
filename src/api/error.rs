#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("Export API unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("Not found on export API: {resource}")]
    NotFound { resource: String },

    #[error("Malformed export API response: {message}")]
    MalformedResponse { message: String },

    #[error("Export API request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ApiError {
    /// Whether the response came back but could not be understood.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ApiError::MalformedResponse { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::MalformedResponse {
                message: e.to_string(),
            }
        } else {
            ApiError::UpstreamUnavailable {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::MalformedResponse {
            message: e.to_string(),
        }
    }
}

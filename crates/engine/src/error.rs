use actix_web::{http::StatusCode, HttpResponse, ResponseError};

pub type Result<T> = std::result::Result<T, RecommendError>;

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("Failed to load dataset from {path}: {message}")]
    DatasetLoad { path: String, message: String },

    #[error("Not enough data to factorize: {users} users x {items} articles")]
    DegenerateInput { users: usize, items: usize },

    #[error("Factorization failed: {0}")]
    Factorization(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Sequence model error: {0}")]
    SequenceModel(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommendError {
    /// Whether the service boundary may recover this error with a fallback list
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RecommendError::InvalidRequest(_) | RecommendError::DatasetLoad { .. }
        )
    }
}

impl From<anyhow::Error> for RecommendError {
    fn from(err: anyhow::Error) -> Self {
        RecommendError::Internal(format!("{:#}", err))
    }
}

impl ResponseError for RecommendError {
    fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RecommendError::DatasetLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

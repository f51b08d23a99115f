use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use floodwatch_common::{ErrorResponse, ValidationError};
use floodwatch_pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Extraction(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message shown to the caller. Upstream details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => self.to_string(),
            ApiError::Pipeline(PipelineError::Extraction(_)) => "AI parsing failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodwatch_pipeline::ExtractionError;

    #[test]
    fn statuses_follow_error_kind() {
        let validation = ApiError::from(ValidationError::MissingFields(vec!["date"]));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.public_message(), "Missing required field(s): date");

        let extraction = ApiError::from(PipelineError::from(ExtractionError::Malformed(
            "expected value".into(),
        )));
        assert_eq!(extraction.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(extraction.public_message(), "AI parsing failed");
    }
}

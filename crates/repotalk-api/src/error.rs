use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use repotalk_assistant::AssistantError;
use repotalk_ingest::IngestError;
use thiserror::Error;

/// Request-level failure. Rendered as a plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{action}: {source}")]
    Assistant {
        action: &'static str,
        #[source]
        source: AssistantError,
    },

    #[error("{action}: {source}")]
    Ingest {
        action: &'static str,
        #[source]
        source: IngestError,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// `map_err` adapter tagging an assistant failure with the step that failed
    pub fn assistant(action: &'static str) -> impl FnOnce(AssistantError) -> Self {
        move |source| ApiError::Assistant { action, source }
    }

    /// `map_err` adapter tagging an ingest failure with the step that failed
    pub fn ingest(action: &'static str) -> impl FnOnce(IngestError) -> Self {
        move |source| ApiError::Ingest { action, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Assistant {
                source: AssistantError::PollTimeout { .. },
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Assistant { .. } | ApiError::Ingest { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %message, "Request rejected");
        }

        (status, message).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

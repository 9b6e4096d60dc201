use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use newsroom_core::error::OrchestratorError;
use serde::Serialize;
use utoipa::{ToResponse, ToSchema};

#[derive(Debug, Serialize, ToResponse, ToSchema)]
pub struct ErrorServer {
    pub message: String,
    pub status: u16,
}

impl std::fmt::Display for ErrorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ErrorServer {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<OrchestratorError> for ErrorServer {
    fn from(error: OrchestratorError) -> Self {
        let status = match &error {
            OrchestratorError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            e if e.is_transient() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        log::error!("Summarize request failed: {}", error);

        ErrorServer {
            message: error.to_string(),
            status: status.into(),
        }
    }
}

use crate::api::IntakeError;
use crate::feed::SourceFetchError;
use crate::notify::DispatchError;
use crate::poller::SchedulerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request rejected at the boundary
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// On-demand fetch of the feed sources failed
    #[error(transparent)]
    Fetch(#[from] SourceFetchError),

    /// Outbound webhook could not be reached
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type AppResult<T> = Result<T, AppError>;

/// API error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Intake(e) => {
                tracing::warn!(error = %e, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            AppError::Fetch(e) => {
                tracing::warn!(url = %e.url, error = %e.source, "On-demand feed fetch failed");
                StatusCode::BAD_REQUEST
            }
            AppError::Dispatch(e) => {
                tracing::error!(error = %e, "Webhook delivery failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Scheduler(e) => {
                tracing::error!(error = %e, "Scheduler error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Every failure a request can end with. All are terminal — nothing here is
/// retried. Responses render as `{ "message": ... }`, plus `eventId` for
/// delivery failures so the caller can correlate the persisted event.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Please set your Discord ID in your account settings")]
    RecipientNotConfigured,

    #[error("{0}")]
    PlanLimitReached(String),

    #[error("You don't have a category named \"{0}\"")]
    CategoryNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Monthly quota reached. Please upgrade your plan for more events")]
    QuotaExceeded,

    #[error("Error processing event")]
    DeliveryFailed { event_id: Uuid },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::RecipientNotConfigured | ApiError::PlanLimitReached(_) => StatusCode::FORBIDDEN,
            ApiError::CategoryNotFound(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DeliveryFailed { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::DeliveryFailed { event_id } => {
                json!({ "message": self.to_string(), "eventId": event_id })
            }
            ApiError::Internal(err) => {
                // The cause stays in the logs; the client gets a generic message.
                error!("internal error: {:#}", err);
                json!({ "message": self.to_string() })
            }
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Run blocking DB work off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::from)
}

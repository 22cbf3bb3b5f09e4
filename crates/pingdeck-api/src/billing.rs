use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use tracing::info;

use pingdeck_types::api::PaymentWebhookRequest;
use pingdeck_types::plan::PlanTier;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// POST /api/webhooks/payment — the payment provider's completion callback.
/// Checkout itself happens entirely on the provider's side; this endpoint
/// only flips the referenced user to PRO.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PaymentWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized".into()))?;
    if secret != state.payment_webhook_secret {
        return Err(ApiError::Unauthenticated("Unauthorized".into()));
    }

    let db = state.clone();
    let uid = req.user_id.to_string();
    let updated = blocking(move || db.db.set_plan(&uid, PlanTier::Pro.as_str())).await?;
    if !updated {
        return Err(ApiError::NotFound(format!("Unknown user {}", req.user_id)));
    }

    info!("user {} upgraded to PRO", req.user_id);
    Ok(Json(serde_json::json!({ "success": true })))
}

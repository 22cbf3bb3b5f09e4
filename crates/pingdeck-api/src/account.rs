use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{Datelike, Utc};
use rand::RngCore;
use tracing::info;
use uuid::Uuid;

use pingdeck_db::models::UserRow;
use pingdeck_types::api::{AccountResponse, SetDiscordIdRequest, UsageResponse};
use pingdeck_types::plan::PlanTier;

use crate::categories::parse_uuid;
use crate::error::{ApiError, blocking};
use crate::middleware::{CurrentUser, decode_session};
use crate::state::AppState;

pub async fn get_account(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<AccountResponse> {
    Json(account_response(&user))
}

pub async fn set_discord_id(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<SetDiscordIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let discord_id = req.discord_id.trim().to_string();
    if discord_id.is_empty() {
        return Err(ApiError::Validation("Discord ID is required.".into()));
    }

    let db = state.clone();
    let uid = user.id.clone();
    blocking(move || db.db.set_discord_id(&uid, &discord_id).map(|_| ())).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn get_usage(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<UsageResponse>, ApiError> {
    let now = Utc::now();
    let (month, year) = (now.month(), now.year());
    let plan = PlanTier::from_db(&user.plan);

    let db = state.clone();
    let uid = user.id.clone();
    let count = blocking(move || db.db.get_quota_count(&uid, month, year)).await?;

    Ok(Json(UsageResponse {
        count,
        limit: plan.quota().max_events_per_month,
        month,
        year,
    }))
}

/// POST /api/auth/sync — interactive-auth bootstrap. Verifies the identity
/// provider's session token directly (the shared middleware would 401 a
/// first-time subject) and creates the user row, with a fresh API key, when
/// none exists yet.
pub async fn sync_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized".into()))?;

    let claims = decode_session(token, &state.session_secret)?;

    let db = state.clone();
    let external_id = claims.sub.clone();
    if let Some(user) = blocking(move || db.db.get_user_by_external_id(&external_id)).await? {
        return Ok(Json(account_response(&user)).into_response());
    }

    let id = Uuid::new_v4();
    let api_key = generate_api_key();

    let db = state.clone();
    let (uid, external_id, email, key) = (
        id.to_string(),
        claims.sub.clone(),
        claims.email.clone(),
        api_key.clone(),
    );
    blocking(move || db.db.create_user(&uid, &external_id, &email, &key)).await?;
    info!("created user {} for subject {}", id, claims.sub);

    let response = AccountResponse {
        id,
        email: claims.email,
        plan: PlanTier::Free,
        api_key,
        discord_id: None,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

fn account_response(user: &UserRow) -> AccountResponse {
    AccountResponse {
        id: parse_uuid(&user.id),
        email: user.email.clone(),
        plan: PlanTier::from_db(&user.plan),
        api_key: user.api_key.clone(),
        discord_id: user.discord_id.clone(),
    }
}

/// 32 random bytes, hex-encoded. Uniqueness is enforced by the DB constraint.
fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::{DateTime, Datelike, Utc};
use tracing::{error, info};
use uuid::Uuid;

use pingdeck_db::models::CategoryRow;
use pingdeck_discord::{DiscordError, Embed, EmbedField};
use pingdeck_types::api::{IngestEventRequest, IngestEventResponse};
use pingdeck_types::category::validate_category_name;
use pingdeck_types::event::DeliveryStatus;
use pingdeck_types::plan::PlanTier;

use crate::error::{ApiError, blocking};
use crate::quota::quota_exceeded;
use crate::state::AppState;

/// POST /api/v1/events — the ingestion pipeline.
///
/// Steps run in strict order, each short-circuiting: authenticate, recipient
/// check, quota check, body validation, category resolution, compose, persist,
/// deliver. The event row is written before the delivery attempt so a failed
/// delivery still has an event id attached to it; the quota counter moves only
/// after a successful delivery.
pub async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Authenticate by API key.
    let api_key = bearer_api_key(&headers)?.to_string();
    let db = state.clone();
    let user = blocking(move || db.db.get_user_by_api_key(&api_key))
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid API key".into()))?;

    // 2. Delivery needs a configured recipient.
    let Some(discord_id) = user.discord_id.clone() else {
        return Err(ApiError::RecipientNotConfigured);
    };

    // 3. Quota check against the current calendar month (UTC).
    let now = Utc::now();
    let (month, year) = (now.month(), now.year());
    let plan = PlanTier::from_db(&user.plan);

    let db = state.clone();
    let uid = user.id.clone();
    let count = blocking(move || db.db.get_quota_count(&uid, month, year)).await?;
    if quota_exceeded(plan, count) {
        return Err(ApiError::QuotaExceeded);
    }

    // 4. Strict body decode — unknown top-level keys and non-scalar field
    //    values are rejected, and the decoder's message is surfaced.
    let req: IngestEventRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?;
    validate_category_name(&req.category).map_err(|m| ApiError::Validation(m.into()))?;

    // 5. Resolve the category. Names were lower-cased at creation; the match
    //    here is exact.
    let db = state.clone();
    let uid = user.id.clone();
    let name = req.category.clone();
    let category = blocking(move || db.db.get_category(&uid, &name))
        .await?
        .ok_or_else(|| ApiError::CategoryNotFound(req.category.clone()))?;

    // 6. Compose the notification.
    let embed = compose_embed(&category, &req, now);
    let formatted_message = format!("{}\n\n{}", embed.title, embed.description);

    // 7. Persist the event row (PENDING) before attempting delivery.
    let event_id = Uuid::new_v4();
    let fields_json = serde_json::to_string(&req.fields).map_err(anyhow::Error::from)?;

    let db = state.clone();
    let (eid, cid, uid, cat_name) = (
        event_id.to_string(),
        category.id.clone(),
        user.id.clone(),
        category.name.clone(),
    );
    blocking(move || db.db.insert_event(&eid, &cid, &uid, &cat_name, &formatted_message, &fields_json))
        .await?;

    // 8. Deliver, then record the outcome. Once the row above exists there is
    //    no abandon path: the final status is always written.
    match deliver(&state, &discord_id, &embed).await {
        Ok(()) => {
            let db = state.clone();
            let eid = event_id.to_string();
            let uid = user.id.clone();
            blocking(move || {
                db.db.set_event_status(&eid, DeliveryStatus::Delivered.as_str())?;
                db.db.increment_quota(&uid, month, year)
            })
            .await?;

            info!("event {} delivered for user {}", event_id, user.id);
            Ok(Json(IngestEventResponse {
                message: "Event processed successfully".into(),
                event_id,
            }))
        }
        Err(err) => {
            error!("delivery failed for event {}: {}", event_id, err);

            let db = state.clone();
            let eid = event_id.to_string();
            blocking(move || db.db.set_event_status(&eid, DeliveryStatus::Failed.as_str())).await?;

            Err(ApiError::DeliveryFailed { event_id })
        }
    }
}

async fn deliver(state: &AppState, recipient_id: &str, embed: &Embed) -> Result<(), DiscordError> {
    let channel = state.discord.create_dm(recipient_id).await?;
    state.discord.send_embed(&channel.id, embed).await
}

/// Extract the API key from `Authorization: Bearer <key>`. The three failure
/// shapes carry distinct messages so callers can tell a missing header from a
/// malformed one.
fn bearer_api_key(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized".into()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthenticated("Invalid auth header format. Expected: 'Bearer [API_KEY]'".into())
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthenticated("Invalid API key".into()));
    }
    Ok(token)
}

fn compose_embed(category: &CategoryRow, req: &IngestEventRequest, now: DateTime<Utc>) -> Embed {
    let emoji = category.emoji.as_deref().unwrap_or("🔔");
    let title = format!("{} {}", emoji, capitalize_first(&category.name));
    let description = req
        .description
        .clone()
        .unwrap_or_else(|| format!("A new {} event has occurred!", category.name));

    Embed {
        title,
        description,
        color: category.color as u32,
        timestamp: now,
        fields: req
            .fields
            .iter()
            .map(|(name, value)| EmbedField {
                name: name.clone(),
                value: value.to_string(),
                inline: true,
            })
            .collect(),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use pingdeck_db::models::EventRow;
use pingdeck_types::api::{CategoryListResponse, CategorySummary, CreateCategoryRequest, EventSummary};
use pingdeck_types::category::{parse_hex_color, validate_category_name};
use pingdeck_types::event::{DeliveryStatus, FieldMap};
use pingdeck_types::plan::PlanTier;

use crate::error::{ApiError, blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Starter categories offered on an empty dashboard.
const QUICKSTART_CATEGORIES: &[(&str, &str, i64)] = &[
    ("bug", "🐛", 0xFF6B6B),
    ("sale", "💰", 0xFFEB3B),
    ("question", "🤔", 0x6C5CE7),
];

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let now = Utc::now();
    let since = start_of_month(now);

    let db = state.clone();
    let uid = user.id.clone();
    let rows = blocking(move || db.db.list_categories(&uid)).await?;

    let mut categories = Vec::with_capacity(rows.len());
    for row in rows {
        let db = state.clone();
        let cid = row.id.clone();
        let window = since.clone();
        let (events_count, field_blobs, last_ping) = blocking(move || {
            let count = db.db.events_count_since(&cid, &window)?;
            let blobs = db.db.event_fields_since(&cid, &window)?;
            let last = db.db.last_event_at(&cid)?;
            Ok((count, blobs, last))
        })
        .await?;

        // Distinct field names across this month's events.
        let mut field_names: HashSet<String> = HashSet::new();
        for blob in &field_blobs {
            match serde_json::from_str::<FieldMap>(blob) {
                Ok(map) => field_names.extend(map.keys().cloned()),
                Err(e) => warn!("Corrupt fields on a '{}' event: {}", row.name, e),
            }
        }

        categories.push(CategorySummary {
            id: parse_uuid(&row.id),
            name: row.name,
            emoji: row.emoji,
            color: row.color as u32,
            created_at: parse_sqlite_timestamp(&row.created_at),
            updated_at: parse_sqlite_timestamp(&row.updated_at),
            events_count,
            unique_fields_count: field_names.len(),
            last_ping: last_ping.as_deref().map(parse_sqlite_timestamp),
        });
    }

    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Names are stored lower-cased; ingestion later matches exactly.
    let name = req.name.trim().to_lowercase();
    validate_category_name(&name).map_err(|m| ApiError::Validation(m.into()))?;
    let color = parse_hex_color(&req.color).map_err(|m| ApiError::Validation(m.into()))?;

    let plan = PlanTier::from_db(&user.plan);
    let db = state.clone();
    let uid = user.id.clone();
    let count = blocking(move || db.db.count_categories(&uid)).await?;
    if count >= i64::from(plan.quota().max_event_categories) {
        return Err(ApiError::PlanLimitReached(format!(
            "Your plan allows up to {} categories. Upgrade to add more",
            plan.quota().max_event_categories
        )));
    }

    let db = state.clone();
    let uid = user.id.clone();
    let lookup = name.clone();
    if blocking(move || db.db.get_category(&uid, &lookup)).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "You already have a category named \"{}\"",
            name
        )));
    }

    let id = Uuid::new_v4();
    let db = state.clone();
    let (cid, uid, cname, emoji) = (id.to_string(), user.id.clone(), name.clone(), req.emoji.clone());
    blocking(move || db.db.create_category(&cid, &uid, &cname, emoji.as_deref(), i64::from(color)))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "name": name,
            "emoji": req.emoji,
            "color": color,
        })),
    ))
}

pub async fn insert_quickstart_categories(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let mut created = 0;
    for &(name, emoji, color) in QUICKSTART_CATEGORIES {
        let db = state.clone();
        let uid = user.id.clone();
        if blocking(move || db.db.get_category(&uid, name)).await?.is_some() {
            continue;
        }

        let db = state.clone();
        let (cid, uid) = (Uuid::new_v4().to_string(), user.id.clone());
        blocking(move || db.db.create_category(&cid, &uid, name, Some(emoji), color)).await?;
        created += 1;
    }

    Ok(Json(serde_json::json!({ "success": true, "created": created })))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = user.id.clone();
    let target = name.clone();
    let deleted = blocking(move || db.db.delete_category(&uid, &target)).await?;

    if !deleted {
        return Err(ApiError::CategoryNotFound(name));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct EventFeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the `created_at` of the oldest event
    /// from the previous page to fetch older events.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

pub async fn get_category_events(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
    Query(query): Query<EventFeedQuery>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let db = state.clone();
    let uid = user.id.clone();
    let lookup = name.clone();
    let category = blocking(move || db.db.get_category(&uid, &lookup))
        .await?
        .ok_or_else(|| ApiError::CategoryNotFound(name))?;

    let limit = query.limit.min(200);
    let before = query.before;
    let db = state.clone();
    let cid = category.id.clone();
    let rows = blocking(move || db.db.list_events(&cid, limit, before.as_deref())).await?;

    Ok(Json(rows.into_iter().map(event_summary).collect()))
}

fn event_summary(row: EventRow) -> EventSummary {
    let fields = serde_json::from_str::<FieldMap>(&row.fields).unwrap_or_else(|e| {
        warn!("Corrupt fields on event '{}': {}", row.id, e);
        FieldMap::default()
    });

    EventSummary {
        id: parse_uuid(&row.id),
        name: row.name,
        fields,
        delivery_status: DeliveryStatus::from_db(&row.delivery_status),
        created_at: parse_sqlite_timestamp(&row.created_at),
    }
}

fn start_of_month(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}-01 00:00:00", now.year(), now.month())
}

pub(crate) fn parse_uuid(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; RFC 3339 values pass through.
pub(crate) fn parse_sqlite_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{DeliveryStatus, FieldMap};
use crate::plan::PlanTier;

// -- Session claims --

/// Claims of the identity-provider session token used on the interactive
/// (dashboard) auth path. `sub` is the provider's subject id, stored as
/// `users.external_id`. Canonical definition lives here so the API middleware
/// and the integration tests share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

// -- Ingestion --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestEventRequest {
    pub category: String,
    pub fields: FieldMap,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestEventResponse {
    pub message: String,
    #[serde(rename = "eventId")]
    pub event_id: Uuid,
}

// -- Categories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// `#RRGGBB`
    pub color: String,
    pub emoji: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub color: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Events in the current calendar month.
    pub events_count: i64,
    /// Distinct field names across this month's events.
    pub unique_fields_count: usize,
    pub last_ping: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub fields: FieldMap,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

// -- Account --

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub plan: PlanTier,
    pub api_key: String,
    pub discord_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDiscordIdRequest {
    pub discord_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub count: i64,
    pub limit: u32,
    pub month: u32,
    pub year: i32,
}

// -- Webhooks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentWebhookRequest {
    pub user_id: Uuid,
}

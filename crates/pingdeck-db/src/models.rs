/// Database row types — these map directly to SQLite rows.
/// Distinct from pingdeck-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub api_key: String,
    pub discord_id: Option<String>,
    pub plan: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub emoji: Option<String>,
    pub color: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: String,
    pub category_id: String,
    pub user_id: String,
    pub name: String,
    pub formatted_message: String,
    /// JSON object text, insertion-ordered as sent by the caller.
    pub fields: String,
    pub delivery_status: String,
    pub created_at: String,
}

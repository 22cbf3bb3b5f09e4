use std::sync::Arc;

use axum::{Json, Router, extract::Path, http::StatusCode, routing::post};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use pingdeck_api::state::{AppState, AppStateInner};
use pingdeck_db::Database;
use pingdeck_discord::DiscordClient;
use pingdeck_types::api::SessionClaims;

pub const SESSION_SECRET: &str = "test-session-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Recipient the stub Discord server opens a DM for but refuses to deliver to.
pub const FAILING_RECIPIENT: &str = "recipient-down";

pub struct TestApp {
    pub base: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// Boot the real router over loopback, backed by an in-memory database and a
/// stub Discord API.
pub async fn spawn_app() -> TestApp {
    let discord_base = spawn_stub_discord().await;

    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        discord: DiscordClient::with_api_base("test-bot-token", discord_base),
        session_secret: SESSION_SECRET.into(),
        payment_webhook_secret: WEBHOOK_SECRET.into(),
    });

    let app = pingdeck_api::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{}", addr),
        state,
        client: reqwest::Client::new(),
    }
}

async fn spawn_stub_discord() -> String {
    let app = Router::new()
        .route("/users/@me/channels", post(stub_create_dm))
        .route("/channels/{channel_id}/messages", post(stub_send_message));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn stub_create_dm(Json(body): Json<Value>) -> Json<Value> {
    // Channel id mirrors the recipient so the message route can tell
    // deliverable recipients from failing ones.
    let recipient = body["recipient_id"].as_str().unwrap_or_default();
    Json(json!({ "id": format!("dm-{}", recipient) }))
}

async fn stub_send_message(Path(channel_id): Path<String>, Json(_body): Json<Value>) -> StatusCode {
    if channel_id == format!("dm-{}", FAILING_RECIPIENT) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

pub fn seed_user(state: &AppState, api_key: &str, discord_id: Option<&str>) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    state
        .db
        .create_user(&id, &format!("ext-{}", id), "user@example.com", api_key)
        .unwrap();
    if let Some(discord_id) = discord_id {
        state.db.set_discord_id(&id, discord_id).unwrap();
    }
    id
}

pub fn seed_category(state: &AppState, user_id: &str, name: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    state
        .db
        .create_category(&id, user_id, name, Some("💰"), 0xFF6B6B)
        .unwrap();
    id
}

pub fn count_events(state: &AppState) -> i64 {
    state
        .db
        .with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
            Ok(count)
        })
        .unwrap()
}

pub fn session_token(sub: &str, email: &str) -> String {
    let claims = SessionClaims {
        sub: sub.into(),
        email: email.into(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .unwrap()
}

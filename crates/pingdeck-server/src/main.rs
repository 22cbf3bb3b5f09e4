use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pingdeck_api::state::AppStateInner;
use pingdeck_db::Database;
use pingdeck_discord::DiscordClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pingdeck=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let session_secret = std::env::var("PINGDECK_SESSION_SECRET")
        .unwrap_or_else(|_| "dev-secret-change-me".into());
    let payment_webhook_secret = std::env::var("PINGDECK_PAYMENT_WEBHOOK_SECRET")
        .unwrap_or_else(|_| "dev-webhook-secret-change-me".into());
    let bot_token = std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default();
    if bot_token.is_empty() {
        warn!("DISCORD_BOT_TOKEN is unset; event delivery will fail");
    }
    let db_path = std::env::var("PINGDECK_DB_PATH").unwrap_or_else(|_| "pingdeck.db".into());
    let host = std::env::var("PINGDECK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PINGDECK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;

    // Shared state. The Discord client is built once here and is read-only
    // for the rest of the process lifetime.
    let state = Arc::new(AppStateInner {
        db,
        discord: DiscordClient::new(bot_token),
        session_secret,
        payment_webhook_secret,
    });

    let app = pingdeck_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Pingdeck server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

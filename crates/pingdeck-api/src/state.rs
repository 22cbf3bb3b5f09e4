use std::sync::Arc;

use pingdeck_db::Database;
use pingdeck_discord::DiscordClient;

pub type AppState = Arc<AppStateInner>;

/// Shared application state. Built once at startup; read-only thereafter.
pub struct AppStateInner {
    pub db: Database,
    pub discord: DiscordClient,
    /// HMAC secret of the identity provider's session tokens.
    pub session_secret: String,
    /// Shared secret the payment provider signs its completion callback with.
    pub payment_webhook_secret: String,
}

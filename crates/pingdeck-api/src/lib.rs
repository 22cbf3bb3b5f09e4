pub mod account;
pub mod billing;
pub mod categories;
pub mod error;
pub mod events;
pub mod middleware;
pub mod quota;
pub mod state;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the full API router. Layering (CORS, request tracing) is the
/// binary's job.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/events", post(events::ingest_event))
        .route("/api/auth/sync", post(account::sync_account))
        .route("/api/webhooks/payment", post(billing::payment_webhook))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/categories", get(categories::list_categories))
        .route("/api/categories", post(categories::create_category))
        .route("/api/categories/quickstart", post(categories::insert_quickstart_categories))
        .route("/api/categories/{name}", delete(categories::delete_category))
        .route("/api/categories/{name}/events", get(categories::get_category_events))
        .route("/api/account", get(account::get_account))
        .route("/api/account/discord-id", put(account::set_discord_id))
        .route("/api/account/usage", get(account::get_usage))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

//! HTTP surface of the owner/message store.

pub mod error;
pub mod messages;
pub mod owners;
pub mod rows;
pub mod state;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};

use veil_types::api::HealthResponse;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/owners", post(owners::create_owner))
        .route("/owners/{unique_id}", get(owners::get_owner))
        .route(
            "/owners/{unique_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/owners/{unique_id}/messages/{message_id}",
            delete(messages::delete_message),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

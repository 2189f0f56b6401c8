use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use veil_types::api::SendMessageRequest;
use veil_types::{Message, validate};

use crate::error::ApiError;
use crate::owners::load_owner;
use crate::rows::message_from_row;
use crate::state::{AppState, with_db};

/// POST /owners/{unique_id}/messages: anonymous, no sender data is recorded.
pub async fn send_message(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
    req: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let text = validate::message_text(&req.text)?.to_string();
    let owner = load_owner(&state, unique_id).await?;

    let owner_id = owner.id.to_string();
    let row = with_db(&state, move |db| db.insert_message(&owner_id, &text)).await?;

    debug!("Stored message {} for {}", row.id, owner.unique_id);
    let message = message_from_row(row).ok_or(ApiError::Internal)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /owners/{unique_id}/messages: the whole inbox, newest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let owner = load_owner(&state, unique_id).await?;

    let owner_id = owner.id.to_string();
    let rows = with_db(&state, move |db| db.get_messages_for_owner(&owner_id)).await?;

    Ok(Json(rows.into_iter().filter_map(message_from_row).collect()))
}

/// DELETE /owners/{unique_id}/messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    path: Result<Path<(String, Uuid)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((unique_id, message_id)) = path?;
    let owner = load_owner(&state, unique_id).await?;

    let owner_id = owner.id.to_string();
    let deleted = with_db(&state, move |db| {
        db.delete_message(&owner_id, &message_id.to_string())
    })
    .await?;

    if !deleted {
        return Err(ApiError::MessageNotFound);
    }
    debug!("Deleted message {} for {}", message_id, owner.unique_id);
    Ok(StatusCode::NO_CONTENT)
}

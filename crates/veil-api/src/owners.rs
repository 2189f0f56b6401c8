use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use veil_db::CreateOwner;
use veil_types::api::CreateOwnerRequest;
use veil_types::{Owner, validate};

use crate::error::ApiError;
use crate::rows::owner_from_row;
use crate::state::{AppState, with_db};

/// POST /owners: register a new link. The client mints `unique_id`; a
/// collision is reported as 409 and never retried here.
pub async fn create_owner(
    State(state): State<AppState>,
    req: Result<Json<CreateOwnerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let unique_id = validate::link_id(&req.unique_id)?.to_string();
    let name = validate::owner_name(&req.name)?.to_string();
    let wallet_address = validate::wallet_address(&req.wallet_address)?;

    let uid = unique_id.clone();
    let row = with_db(&state, move |db| {
        db.create_owner(CreateOwner {
            unique_id: &uid,
            name: &name,
            wallet_address: &wallet_address,
        })
    })
    .await?
    .ok_or_else(|| ApiError::Conflict(unique_id))?;

    info!("Created link {}", row.unique_id);
    let owner = owner_from_row(row).ok_or(ApiError::Internal)?;
    Ok((StatusCode::CREATED, Json(owner)))
}

/// GET /owners/{unique_id}
pub async fn get_owner(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<Owner>, ApiError> {
    Ok(Json(load_owner(&state, unique_id).await?))
}

/// Resolve a link id to its owner or 404.
pub(crate) async fn load_owner(state: &AppState, unique_id: String) -> Result<Owner, ApiError> {
    let uid = unique_id.clone();
    let row = with_db(state, move |db| db.get_owner_by_unique_id(&uid))
        .await?
        .ok_or_else(|| ApiError::OwnerNotFound(unique_id))?;
    owner_from_row(row).ok_or(ApiError::Internal)
}

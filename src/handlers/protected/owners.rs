// handlers/protected/owners.rs - /api/owners handlers (writes are manager only)

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Owner, OwnerStatus};
use crate::middleware::{require_manager, ApiResponse, ApiResult, AuthUser};
use crate::services::owner_service::{CreateOwner, OwnerFilters, UpdateOwner};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OwnerStatus,
}

/// GET /api/owners
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<OwnerFilters>,
) -> ApiResult<Vec<Owner>> {
    let owners = state.owners().list(filters, &user).await?;
    let count = owners.len();
    Ok(ApiResponse::success(owners).with_field("count", count))
}

/// GET /api/owners/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Owner> {
    let owner = state.owners().get(id, &user).await?;
    Ok(ApiResponse::success(owner))
}

/**
 * POST /api/owners - Register a property owner
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Olive Owner",            // Required, at least 2 characters
 *   "email": "olive@example.com",     // Required, unique
 *   "create_user_account": true,      // Optional
 *   "user_password": "secret"         // Required when creating an account
 * }
 * ```
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateOwner>, JsonRejection>,
) -> ApiResult<Owner> {
    require_manager(&user)?;
    let Json(input) = payload?;
    let (owner, account) = state.owners().create(input, &user).await?;

    let response = ApiResponse::created(owner);
    Ok(match account {
        Some(account) => response.with_field("user", account),
        None => response,
    })
}

/// PUT /api/owners/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateOwner>, JsonRejection>,
) -> ApiResult<Owner> {
    require_manager(&user)?;
    let Json(patch) = payload?;
    let owner = state.owners().update(id, patch, &user).await?;
    Ok(ApiResponse::success(owner))
}

/// DELETE /api/owners/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    require_manager(&user)?;
    state.owners().delete(id, &user).await?;
    Ok(ApiResponse::success(()).with_message("Owner deleted successfully"))
}

/// PATCH /api/owners/:id/status
pub async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<Owner> {
    require_manager(&user)?;
    let Json(body) = payload?;
    let owner = state.owners().set_status(id, body.status, &user).await?;
    Ok(ApiResponse::success(owner))
}

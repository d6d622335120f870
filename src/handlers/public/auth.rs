// handlers/public/auth.rs - POST /api/auth/login, POST /api/auth/admin/create

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::app::AppState;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{CreateAdminRequest, LoginRequest, LoginResponse};

/**
 * POST /api/auth/login - Authenticate user and receive JWT token
 *
 * Expected Input:
 * ```json
 * { "email": "manager@easylease.app", "password": "secret" }
 * ```
 *
 * Expected Output (Success):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "user": { "id": "...", "email": "...", "name": "...", "role": "manager" },
 *     "token": "eyJhbGciOiJIUzI1NiI..."
 *   }
 * }
 * ```
 *
 * Errors: 400 when a field is missing, 401 for bad credentials or an inactive account.
 */
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    let response = state.auth().login(request).await?;
    Ok(ApiResponse::success(response))
}

/// POST /api/auth/admin/create - bootstrap a manager account
pub async fn create_admin(
    State(state): State<AppState>,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = payload?;
    let user = state.auth().create_admin(request).await?;
    Ok(ApiResponse::created(user).with_message("Admin user created successfully"))
}

// handlers/protected/auth.rs - Session endpoints for the signed-in user

use axum::extract::{rejection::JsonRejection, State};
use axum::{Extension, Json};

use crate::app::AppState;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::auth_service::ChangePasswordRequest;

/// GET /api/auth/me - the account behind the token
pub async fn me(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<User> {
    let account = state.auth().me(&user).await?;
    Ok(ApiResponse::success(account))
}

/**
 * POST /api/auth/change-password
 *
 * Expected Input:
 * ```json
 * { "currentPassword": "old-secret", "newPassword": "new-secret" }
 * ```
 *
 * The new password must meet the configured minimum length; a wrong current
 * password is a 401.
 */
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(request) = payload?;
    state.auth().change_password(request, &user).await?;
    Ok(ApiResponse::success(()).with_message("Password changed successfully"))
}

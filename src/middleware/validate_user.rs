use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;

/// Middleware that checks the token's user against the store.
/// The account must still exist, be active and hold the role the token claims.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get AuthUser from JWT middleware
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.store.get_user(auth_user.user_id).await.map_err(|e| {
        tracing::error!("Store error validating user {}: {}", auth_user.user_id, e);
        ApiError::internal_server_error("Failed to validate user")
    })?;

    let user = user.ok_or_else(|| {
        tracing::warn!("User validation failed: {} ({}) no longer exists", auth_user.email, auth_user.user_id);
        ApiError::unauthorized("User not found")
    })?;

    if !user.is_active {
        tracing::warn!("User validation failed: {} is inactive", user.email);
        return Err(ApiError::unauthorized("User account is inactive"));
    }

    if user.role != auth_user.role {
        tracing::warn!(
            "User validation failed: token role '{}' doesn't match stored role '{}'",
            auth_user.role,
            user.role
        );
        return Err(ApiError::unauthorized("Token no longer matches account, please sign in again"));
    }

    tracing::debug!("User validation successful: {} ({})", user.email, user.role);

    Ok(next.run(request).await)
}

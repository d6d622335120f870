// handlers/protected/dashboard.rs - GET /api/dashboard/stats

use axum::extract::State;
use axum::Extension;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::dashboard_service::Dashboard;

/// Role-shaped statistics: global counts for managers, portfolio figures for
/// owners, lease and next payment for tenants.
pub async fn stats(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Dashboard> {
    let dashboard = state.dashboard().stats(&user).await?;
    Ok(ApiResponse::success(dashboard))
}

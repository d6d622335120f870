// handlers/protected/leads.rs - /api/leads handlers for staff

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Lead, LeadStatus};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::lead_service::{LeadFilters, LeadView, UpdateLead};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: LeadStatus,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<LeadFilters>,
) -> ApiResult<Vec<LeadView>> {
    let leads = state.leads().list(filters, &user).await?;
    let count = leads.len();
    Ok(ApiResponse::success(leads).with_field("count", count))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<LeadView> {
    let lead = state.leads().get(id, &user).await?;
    Ok(ApiResponse::success(lead))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateLead>, JsonRejection>,
) -> ApiResult<Lead> {
    let Json(patch) = payload?;
    let lead = state.leads().update(id, patch, &user).await?;
    Ok(ApiResponse::success(lead))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.leads().delete(id, &user).await?;
    Ok(ApiResponse::success(()).with_message("Lead deleted successfully"))
}

/// PATCH /api/leads/:id/status - new | contacted | converted | discarded
pub async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<Lead> {
    let Json(body) = payload?;
    let lead = state.leads().set_status(id, body.status, &user).await?;
    Ok(ApiResponse::success(lead))
}

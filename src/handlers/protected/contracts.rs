// handlers/protected/contracts.rs - /api/contracts handlers
//
// Every write goes through ContractService, which keeps the tenant's
// current contract and the listing's occupancy in step with the contract.

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::contract_service::{ContractFilters, ContractView, CreateContract, NewDocument, UpdateContract};

#[derive(Debug, Deserialize)]
pub struct AssignTenantBody {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TerminateBody {
    #[serde(alias = "reason")]
    pub termination_reason: Option<String>,
}

/// GET /api/contracts - role-scoped list, filterable by status, tenant, listing and owner
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<ContractFilters>,
) -> ApiResult<Vec<ContractView>> {
    let contracts = state.contracts().list(filters, &user).await?;
    let count = contracts.len();
    Ok(ApiResponse::success(contracts).with_field("count", count))
}

/// GET /api/contracts/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContractView> {
    let contract = state.contracts().get(id, &user).await?;
    Ok(ApiResponse::success(contract))
}

/**
 * POST /api/contracts - Create a contract for a listing
 *
 * Expected Input:
 * ```json
 * {
 *   "listing_id": "uuid",          // Required
 *   "tenant_id": "uuid",           // Optional, required for an active contract
 *   "start_date": "2025-01-01",
 *   "end_date": "2025-07-01",
 *   "weekly_rent": 250,
 *   "status": "draft"              // Optional, defaults to draft
 * }
 * ```
 *
 * Refused when the listing or the tenant already holds an open contract.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateContract>, JsonRejection>,
) -> ApiResult<ContractView> {
    let Json(input) = payload?;
    let contract = state.contracts().create(input, &user).await?;
    Ok(ApiResponse::created(contract).with_message("Contract created successfully"))
}

/// PUT /api/contracts/:id - partial update; a status change runs the transition rules
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateContract>, JsonRejection>,
) -> ApiResult<ContractView> {
    let Json(patch) = payload?;
    let contract = state.contracts().update(id, patch, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Contract updated successfully"))
}

/// DELETE /api/contracts/:id - managers only, draft contracts only
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.contracts().delete(id, &user).await?;
    Ok(ApiResponse::success(()).with_message("Contract deleted successfully"))
}

/// POST /api/contracts/:id/assign-tenant
pub async fn assign_tenant(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AssignTenantBody>, JsonRejection>,
) -> ApiResult<ContractView> {
    let Json(body) = payload?;
    let tenant_id = body
        .tenant_id
        .ok_or_else(|| ApiError::bad_request("Tenant ID is required"))?;
    let contract = state.contracts().assign_tenant(id, tenant_id, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Tenant assigned to contract successfully"))
}

/**
 * POST /api/contracts/:id/terminate
 *
 * Expected Input (optional body):
 * ```json
 * { "termination_reason": "Tenant moved out early" }
 * ```
 *
 * Stamps the termination date, releases the tenant and republishes the listing.
 */
pub async fn terminate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TerminateBody>>,
) -> ApiResult<ContractView> {
    let body = payload.map(|Json(body)| body).unwrap_or_default();
    let contract = state.contracts().terminate(id, body.termination_reason, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Contract terminated successfully"))
}

/// POST /api/contracts/:id/restart - terminated → active, clearing the termination fields
pub async fn restart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContractView> {
    let contract = state.contracts().restart(id, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Contract restarted successfully"))
}

/// POST /api/contracts/:id/duplicate - draft copy of a closed contract
pub async fn duplicate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContractView> {
    let contract = state.contracts().duplicate(id, &user).await?;
    Ok(ApiResponse::created(contract).with_message("Contract duplicated successfully"))
}

/// POST /api/contracts/:id/documents
pub async fn add_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> ApiResult<ContractView> {
    let Json(document) = payload?;
    let contract = state.contracts().add_document(id, document, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Document added successfully"))
}

/// DELETE /api/contracts/:id/documents/:document_id
pub async fn remove_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ContractView> {
    let contract = state.contracts().remove_document(id, document_id, &user).await?;
    Ok(ApiResponse::success(contract).with_message("Document removed successfully"))
}

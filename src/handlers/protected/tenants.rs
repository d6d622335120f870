// handlers/protected/tenants.rs - /api/tenants handlers

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::tenant_service::{
    ConvertLead, CreateTenant, EndingSoonTenant, TenantFilters, TenantView, UpdateTenant,
};

/// GET /api/tenants - paged list with `pagination` next to `data`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<TenantFilters>,
) -> ApiResult<Vec<TenantView>> {
    let (tenants, pagination) = state.tenants().list(filters, &user).await?;
    Ok(ApiResponse::success(tenants).with_pagination(pagination))
}

/// GET /api/tenants/ending-soon
pub async fn ending_soon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<EndingSoonTenant>> {
    let tenants = state.tenants().ending_soon(&user).await?;
    let count = tenants.len();
    Ok(ApiResponse::success(tenants).with_field("count", count))
}

/// GET /api/tenants/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TenantView> {
    let tenant = state.tenants().get(id, &user).await?;
    Ok(ApiResponse::success(tenant))
}

/**
 * POST /api/tenants - Create a tenant, optionally with a lease and a login
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Tom Tenant",                // Required
 *   "email": "tom@example.com",          // Required
 *   "listing_id": "uuid",                // Optional, also decides the owner
 *   "create_contract": true,             // Optional
 *   "contract_data": { "weekly_rent": 250 },
 *   "create_user_account": true,         // Optional
 *   "user_password": "secret"            // Optional, generated when missing
 * }
 * ```
 *
 * Expected Output: the tenant in `data`, plus `user` and `contract` reporting
 * what happened to the optional login and lease.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateTenant>, JsonRejection>,
) -> ApiResult<TenantView> {
    let Json(input) = payload?;
    let created = state.tenants().create(input, &user).await?;

    let mut response = ApiResponse::created(created.tenant).with_message("Tenant created successfully");
    if let Some(account) = created.user {
        response = response.with_field("user", account);
    }
    if let Some(contract) = created.contract {
        response = response.with_field("contract", contract);
    }
    Ok(response)
}

/// PUT /api/tenants/:id - personal fields only
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTenant>, JsonRejection>,
) -> ApiResult<TenantView> {
    let Json(patch) = payload?;
    let tenant = state.tenants().update(id, patch, &user).await?;
    Ok(ApiResponse::success(tenant).with_message("Tenant updated successfully"))
}

/// DELETE /api/tenants/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.tenants().delete(id, &user).await?;
    Ok(ApiResponse::success(()).with_message("Tenant deleted successfully"))
}

/// POST /api/tenants/:id/unlink - terminate the tenant's lease and free the listing
pub async fn unlink(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TenantView> {
    let tenant = state.tenants().unlink(id, &user).await?;
    Ok(ApiResponse::success(tenant).with_message("Tenant unlinked from property successfully"))
}

/// POST /api/tenants/convert-from-lead/:lead_id
///
/// The lead must reference a listing. The body carries optional lease terms and
/// contact details; an empty body takes the default lease.
pub async fn convert_from_lead(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(lead_id): Path<Uuid>,
    payload: Option<Json<ConvertLead>>,
) -> ApiResult<TenantView> {
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    let tenant = state.tenants().convert_from_lead(lead_id, input, &user).await?;
    Ok(ApiResponse::created(tenant).with_message("Lead converted to tenant successfully"))
}

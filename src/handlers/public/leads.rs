// handlers/public/leads.rs - POST /api/leads (enquiry form)

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::app::AppState;
use crate::database::models::Lead;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::lead_service::CreateLead;

/**
 * POST /api/leads - Submit an enquiry about a listing
 *
 * Expected Input:
 * ```json
 * { "name": "Ana", "email": "ana@example.com", "phone": "+61...", "message": "...", "listing_id": "uuid" }
 * ```
 *
 * New leads always start in status `new`.
 */
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateLead>, JsonRejection>,
) -> ApiResult<Lead> {
    let Json(input) = payload?;
    let lead = state.leads().create(input).await?;
    Ok(ApiResponse::created(lead).with_message("Thank you for your enquiry. We will be in touch soon."))
}

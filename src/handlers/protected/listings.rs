// handlers/protected/listings.rs - Listing administration and the image proxy

use axum::extract::{rejection::JsonRejection, Multipart, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Listing;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::listing_service::{AdminListingFilters, CreateListing, ImageUpload, ListingView, UpdateListing};

#[derive(Debug, Deserialize)]
pub struct DeleteImageBody {
    #[serde(default, alias = "imageUrl")]
    pub image_url: String,
}

/// GET /api/listings/admin/all - every status, scoped to the caller's role
pub async fn list_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filters): Query<AdminListingFilters>,
) -> ApiResult<Vec<ListingView>> {
    let listings = state.listings().list_all(filters, &user).await?;
    let count = listings.len();
    Ok(ApiResponse::success(listings).with_field("count", count))
}

/// GET /api/listings/admin/:id - listing with its active contract and contract history
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ListingView> {
    let listing = state.listings().get(id, &user).await?;
    Ok(ApiResponse::success(listing))
}

/**
 * POST /api/listings - Publish a new listing
 *
 * Expected Input:
 * ```json
 * {
 *   "title": "Sunny room in Fitzroy",    // Required, at least 3 characters
 *   "address": "12 Smith St",            // Required, at least 5 characters
 *   "suburb": "Fitzroy",
 *   "price_per_week": 280,
 *   "location": { "type": "Point", "coordinates": [144.97, -37.80] },
 *   "owner_id": "uuid"                   // Managers only; owners list for themselves
 * }
 * ```
 *
 * The slug is derived from suburb and title plus a timestamp.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateListing>, JsonRejection>,
) -> ApiResult<Listing> {
    let Json(input) = payload?;
    let listing = state.listings().create(input, &user).await?;
    Ok(ApiResponse::created(listing))
}

/// PUT /api/listings/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateListing>, JsonRejection>,
) -> ApiResult<Listing> {
    let Json(patch) = payload?;
    let listing = state.listings().update(id, patch, &user).await?;
    Ok(ApiResponse::success(listing))
}

/// DELETE /api/listings/:id - refused while a contract on the listing is still open
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.listings().delete(id, &user).await?;
    Ok(ApiResponse::success(()).with_message("Listing deleted successfully"))
}

/**
 * POST /api/listings/upload-images - multipart proxy to object storage
 *
 * Parts:
 * - `images`: up to 10 image files, 5MB each
 * - `folder`: optional folder inside the bucket (bucket root when missing)
 *
 * Expected Output:
 * ```json
 * { "success": true, "data": { "urls": ["https://.../storage/v1/object/public/..."] } }
 * ```
 */
pub async fn upload_images(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<serde_json::Value> {
    let mut folder = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("folder") => {
                let text = field.text().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !text.trim().is_empty() {
                    folder = Some(text.trim().to_string());
                }
            }
            Some("images") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
                files.push(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    let urls = state.listings().upload_images(folder, files, &user).await?;
    Ok(ApiResponse::success(serde_json::json!({ "urls": urls })))
}

/// DELETE /api/listings/delete-image - body `{ "imageUrl": "<public url>" }`
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<DeleteImageBody>, JsonRejection>,
) -> ApiResult<()> {
    let Json(body) = payload?;
    state.listings().delete_image(&body.image_url, &user).await?;
    Ok(ApiResponse::success(()).with_message("Image deleted successfully"))
}

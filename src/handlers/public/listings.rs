// handlers/public/listings.rs - Published listing catalogue

use axum::extract::{Path, Query, State};

use crate::app::AppState;
use crate::database::models::Listing;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::listing_service::PublicListingFilters;

/// GET /api/listings - published listings, newest first
///
/// Filters: `suburb` (partial match), `room_type`, `min_price`, `max_price`, `limit`.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<PublicListingFilters>,
) -> ApiResult<Vec<Listing>> {
    let listings = state.listings().list_published(filters).await?;
    let count = listings.len();
    Ok(ApiResponse::success(listings).with_field("count", count))
}

/// GET /api/listings/slug/:slug
pub async fn by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Listing> {
    let listing = state.listings().get_by_slug(&slug).await?;
    Ok(ApiResponse::success(listing))
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::storage_service::object_name;
use super::{OwnerSummary, ServiceError, ServiceResult, StorageError, StorageService, TenantSummary};
use crate::auth::AuthUser;
use crate::config::StorageConfig;
use crate::database::models::listing::make_slug;
use crate::database::models::{
    flexible_date, Contract, ContractStatus, GeoPoint, Listing, ListingStatus, Locale, Role, RoomType,
};
use crate::store::{ContractQuery, ListingQuery, RentalStore};

/// Query-string filters for the public listing search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicListingFilters {
    pub suburb: Option<String>,
    pub room_type: Option<RoomType>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListingFilters {
    pub status: Option<ListingStatus>,
    pub limit: Option<i32>,
}

/// Accepts either `{lng, lat}` or a GeoJSON point `{type: "Point", coordinates: [lng, lat]}`
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    GeoJson { coordinates: [f64; 2] },
    Point(GeoPoint),
}

impl From<LocationInput> for GeoPoint {
    fn from(input: LocationInput) -> Self {
        match input {
            LocationInput::GeoJson { coordinates: [lng, lat] } => GeoPoint { lng, lat },
            LocationInput::Point(point) => point,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    pub suburb: Option<String>,
    pub location: Option<LocationInput>,
    pub room_type: Option<RoomType>,
    pub price_per_week: Option<Decimal>,
    pub bond: Option<Decimal>,
    pub bills_included: Option<bool>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub available_from: Option<DateTime<Utc>>,
    pub min_term_weeks: Option<i32>,
    #[serde(default)]
    pub preferred_tenants: Vec<String>,
    #[serde(default)]
    pub house_features: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub locale: Option<Locale>,
    pub owner_id: Option<Uuid>,
}

/// Descriptive fields only; `status` and `tenant_id` follow the contract lifecycle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateListing {
    pub title: Option<String>,
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub location: Option<LocationInput>,
    pub room_type: Option<RoomType>,
    pub price_per_week: Option<Decimal>,
    pub bond: Option<Decimal>,
    pub bills_included: Option<bool>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub available_from: Option<DateTime<Utc>>,
    pub min_term_weeks: Option<i32>,
    pub preferred_tenants: Option<Vec<String>>,
    pub house_features: Option<Vec<String>>,
    pub rules: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub locale: Option<Locale>,
}

/// An uploaded file as received from the multipart body
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Contract fields embedded in a listing
#[derive(Debug, Clone, Serialize)]
pub struct ListingContract {
    pub id: Uuid,
    pub status: ContractStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub weekly_rent: Decimal,
    pub tenant: Option<TenantSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    pub owner: Option<OwnerSummary>,
    pub active_contract: Option<ListingContract>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts: Option<Vec<ListingContract>>,
}

pub struct ListingService {
    store: Arc<dyn RentalStore>,
    storage: StorageService,
    limits: StorageConfig,
    default_limit: i32,
    max_limit: i32,
}

impl ListingService {
    pub fn new(store: Arc<dyn RentalStore>, storage: StorageService, limits: StorageConfig, default_limit: i32, max_limit: i32) -> Self {
        Self {
            store,
            storage,
            limits,
            default_limit,
            max_limit,
        }
    }

    /// Published listings, newest first
    pub async fn list_published(&self, filters: PublicListingFilters) -> ServiceResult<Vec<Listing>> {
        let query = ListingQuery {
            statuses: vec![ListingStatus::Published],
            suburb: filters.suburb.filter(|s| !s.trim().is_empty()),
            room_type: filters.room_type,
            min_price: filters.min_price,
            max_price: filters.max_price,
            limit: Some(self.clamp_limit(filters.limit)),
            ..Default::default()
        };
        Ok(self.store.list_listings(&query).await?)
    }

    pub async fn get_by_slug(&self, slug: &str) -> ServiceResult<Listing> {
        let query = ListingQuery {
            slug: Some(slug.to_string()),
            statuses: vec![ListingStatus::Published],
            limit: Some(1),
            ..Default::default()
        };
        self.store
            .list_listings(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Listing not found"))
    }

    /// Role-scoped listing table with each listing's active contract
    pub async fn list_all(&self, filters: AdminListingFilters, actor: &AuthUser) -> ServiceResult<Vec<ListingView>> {
        let mut query = ListingQuery {
            statuses: filters.status.into_iter().collect(),
            limit: Some(self.clamp_limit(filters.limit)),
            ..Default::default()
        };
        match actor.role {
            Role::Manager => {}
            Role::Owner => {
                let owner_id = actor
                    .owner_id
                    .ok_or_else(|| ServiceError::validation("Owner must have an owner_id"))?;
                query.owner_id = Some(owner_id);
            }
            Role::Tenant => match self.rented_listing(actor).await? {
                Some(listing_id) => query.ids = Some(vec![listing_id]),
                None => return Ok(vec![]),
            },
        }

        let listings = self.store.list_listings(&query).await?;
        let mut views = Vec::with_capacity(listings.len());
        for listing in listings {
            views.push(self.view(listing, false).await?);
        }
        Ok(views)
    }

    /// One listing with its active contract and full contract history
    pub async fn get(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<ListingView> {
        let listing = self.load(id).await?;
        match actor.role {
            Role::Manager => {}
            Role::Owner => {
                if actor.owner_id.is_none() {
                    return Err(ServiceError::validation("Owner must have an owner_id"));
                }
                if actor.owner_id != Some(listing.owner_id) {
                    return Err(ServiceError::forbidden(
                        "Access denied. This property belongs to another owner.",
                    ));
                }
            }
            Role::Tenant => {
                if self.rented_listing(actor).await? != Some(listing.id) {
                    return Err(ServiceError::forbidden(
                        "Access denied. You can only view your rental property.",
                    ));
                }
            }
        }
        self.view(listing, true).await
    }

    pub async fn create(&self, input: CreateListing, actor: &AuthUser) -> ServiceResult<Listing> {
        if input.title.trim().chars().count() < 3 {
            return Err(ServiceError::validation("title must be at least 3 characters"));
        }
        if input.address.trim().chars().count() < 5 {
            return Err(ServiceError::validation("address must be at least 5 characters"));
        }

        let owner_id = match actor.role {
            Role::Owner => actor
                .owner_id
                .ok_or_else(|| ServiceError::validation("Owner must have an owner_id"))?,
            Role::Manager => input
                .owner_id
                .ok_or_else(|| ServiceError::validation("owner_id is required"))?,
            Role::Tenant => return Err(ServiceError::forbidden("Tenants cannot create listings")),
        };
        if self.store.get_owner(owner_id).await?.is_none() {
            return Err(ServiceError::not_found("Owner not found"));
        }

        let now = Utc::now();
        let title = input.title.trim().to_string();
        let listing = Listing {
            id: Uuid::new_v4(),
            slug: make_slug(input.suburb.as_deref(), &title, now),
            title,
            address: input.address.trim().to_string(),
            suburb: input.suburb,
            location: input.location.map(GeoPoint::from),
            room_type: input.room_type,
            price_per_week: input.price_per_week,
            bond: input.bond,
            bills_included: input.bills_included.unwrap_or(true),
            available_from: input.available_from,
            min_term_weeks: input.min_term_weeks.unwrap_or(12),
            preferred_tenants: input.preferred_tenants,
            house_features: input.house_features,
            rules: input.rules,
            images: input.images,
            owner_id,
            status: ListingStatus::Published,
            tenant_id: None,
            locale: input.locale.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let listing = self.store.insert_listing(listing).await?;
        info!(listing_id = %listing.id, slug = %listing.slug, owner_id = %owner_id, "listing created");
        Ok(listing)
    }

    pub async fn update(&self, id: Uuid, patch: UpdateListing, actor: &AuthUser) -> ServiceResult<Listing> {
        let mut listing = self.load(id).await?;
        ensure_can_write(&listing, actor)?;

        if let Some(title) = patch.title {
            if title.trim().chars().count() < 3 {
                return Err(ServiceError::validation("title must be at least 3 characters"));
            }
            listing.title = title.trim().to_string();
        }
        if let Some(address) = patch.address {
            if address.trim().chars().count() < 5 {
                return Err(ServiceError::validation("address must be at least 5 characters"));
            }
            listing.address = address.trim().to_string();
        }
        if let Some(v) = patch.suburb {
            listing.suburb = Some(v);
        }
        if let Some(v) = patch.location {
            listing.location = Some(v.into());
        }
        if let Some(v) = patch.room_type {
            listing.room_type = Some(v);
        }
        if let Some(v) = patch.price_per_week {
            listing.price_per_week = Some(v);
        }
        if let Some(v) = patch.bond {
            listing.bond = Some(v);
        }
        if let Some(v) = patch.bills_included {
            listing.bills_included = v;
        }
        if let Some(v) = patch.available_from {
            listing.available_from = Some(v);
        }
        if let Some(v) = patch.min_term_weeks {
            listing.min_term_weeks = v;
        }
        if let Some(v) = patch.preferred_tenants {
            listing.preferred_tenants = v;
        }
        if let Some(v) = patch.house_features {
            listing.house_features = v;
        }
        if let Some(v) = patch.rules {
            listing.rules = v;
        }
        if let Some(v) = patch.images {
            listing.images = v;
        }
        if let Some(v) = patch.locale {
            listing.locale = v;
        }
        listing.updated_at = Utc::now();

        Ok(self.store.update_listing(listing).await?)
    }

    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<()> {
        let listing = self.load(id).await?;
        ensure_can_write(&listing, actor)?;

        let open = ContractQuery::for_listing(id).with_statuses(&ContractStatus::OPEN);
        if self.store.count_contracts(&open).await? > 0 {
            return Err(ServiceError::validation(
                "Cannot delete a listing with an open contract. Terminate or delete the contract first.",
            ));
        }

        self.store.delete_listing(id).await?;
        info!(listing_id = %id, "listing deleted");
        Ok(())
    }

    /// Uploads listing photos and returns their public URLs in upload order.
    pub async fn upload_images(&self, folder: Option<String>, files: Vec<ImageUpload>, actor: &AuthUser) -> ServiceResult<Vec<String>> {
        if actor.is_tenant() {
            return Err(ServiceError::forbidden("Tenants cannot upload listing images"));
        }
        if files.is_empty() {
            return Err(ServiceError::validation("No files uploaded"));
        }
        if files.len() > self.limits.max_images_per_upload {
            return Err(ServiceError::Validation(format!(
                "A maximum of {} images can be uploaded at once",
                self.limits.max_images_per_upload
            )));
        }
        for file in &files {
            if !file.content_type.starts_with("image/") {
                return Err(ServiceError::validation("Only image files are allowed"));
            }
            if file.bytes.len() > self.limits.max_image_bytes {
                return Err(ServiceError::Validation(format!(
                    "{} exceeds the {}MB size limit",
                    file.file_name.as_deref().unwrap_or("Image"),
                    self.limits.max_image_bytes / (1024 * 1024)
                )));
            }
        }

        let folder = folder.unwrap_or_default();
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            let path = object_name(&folder, &file.content_type, &file.bytes);
            urls.push(self.storage.upload(&path, file.bytes, &file.content_type).await?);
        }
        info!(count = urls.len(), folder = %folder, "listing images uploaded");
        Ok(urls)
    }

    pub async fn delete_image(&self, image_url: &str, actor: &AuthUser) -> ServiceResult<()> {
        if actor.is_tenant() {
            return Err(ServiceError::forbidden("Tenants cannot delete listing images"));
        }
        if image_url.trim().is_empty() {
            return Err(ServiceError::validation("Image URL is required"));
        }
        let path = self.storage.path_from_public_url(image_url).map_err(|e| match e {
            StorageError::InvalidUrl => ServiceError::validation(e.to_string()),
            other => other.into(),
        })?;
        self.storage.delete(&path).await?;
        Ok(())
    }

    async fn view(&self, listing: Listing, with_history: bool) -> ServiceResult<ListingView> {
        let owner = self.store.get_owner(listing.owner_id).await?;

        let active_query = ContractQuery {
            limit: Some(1),
            ..ContractQuery::for_listing(listing.id).with_statuses(&ContractStatus::ACTIVE_LIKE)
        };
        let active_contract = match self.store.list_contracts(&active_query).await?.into_iter().next() {
            Some(contract) => Some(self.embed(contract).await?),
            None => None,
        };

        let contracts = if with_history {
            let mut history = self.store.list_contracts(&ContractQuery::for_listing(listing.id)).await?;
            history.sort_by(|a, b| b.start_date.cmp(&a.start_date));
            let mut embedded = Vec::with_capacity(history.len());
            for contract in history {
                embedded.push(self.embed(contract).await?);
            }
            Some(embedded)
        } else {
            None
        };

        Ok(ListingView {
            owner: owner.as_ref().map(OwnerSummary::from),
            active_contract,
            contracts,
            listing,
        })
    }

    async fn embed(&self, contract: Contract) -> ServiceResult<ListingContract> {
        let tenant = match contract.tenant_id {
            Some(id) => self.store.get_tenant(id).await?,
            None => None,
        };
        Ok(ListingContract {
            id: contract.id,
            status: contract.status,
            start_date: contract.start_date,
            end_date: contract.end_date,
            weekly_rent: contract.weekly_rent,
            tenant: tenant.as_ref().map(TenantSummary::from),
        })
    }

    /// The listing behind a tenant's current lease
    async fn rented_listing(&self, actor: &AuthUser) -> ServiceResult<Option<Uuid>> {
        let tenant_id = actor
            .tenant_id
            .ok_or_else(|| ServiceError::validation("Tenant must have a tenant_id"))?;
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant data not found"))?;
        let Some(contract_id) = tenant.current_contract_id else {
            return Ok(None);
        };
        Ok(self.store.get_contract(contract_id).await?.map(|c| c.listing_id))
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Listing> {
        self.store
            .get_listing(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Listing not found"))
    }

    fn clamp_limit(&self, limit: Option<i32>) -> i32 {
        limit.unwrap_or(self.default_limit).clamp(1, self.max_limit)
    }
}

fn ensure_can_write(listing: &Listing, actor: &AuthUser) -> ServiceResult<()> {
    match actor.role {
        Role::Manager => Ok(()),
        Role::Owner if actor.owner_id == Some(listing.owner_id) => Ok(()),
        Role::Owner => Err(ServiceError::forbidden("Access denied. This property belongs to another owner.")),
        Role::Tenant => Err(ServiceError::forbidden("Tenants cannot modify listings")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Owner, OwnerStatus};
    use crate::store::InMemoryStore;

    fn actor(role: Role, owner_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            role,
            owner_id,
            tenant_id: None,
        }
    }

    fn create_input(title: &str) -> CreateListing {
        CreateListing {
            title: title.into(),
            address: "22 Crown St".into(),
            suburb: Some("Surry Hills".into()),
            location: None,
            room_type: Some(RoomType::Double),
            price_per_week: Some(Decimal::new(320, 0)),
            bond: None,
            bills_included: None,
            available_from: None,
            min_term_weeks: None,
            preferred_tenants: vec![],
            house_features: vec![],
            rules: vec![],
            images: vec![],
            locale: None,
            owner_id: None,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, ListingService, Owner) {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let owner = store
            .insert_owner(Owner {
                id: Uuid::new_v4(),
                name: "Olive".into(),
                email: "olive@example.com".into(),
                phone: None,
                company: None,
                status: OwnerStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let service = ListingService::new(
            store.clone(),
            StorageService::new(StorageConfig::default()),
            StorageConfig::default(),
            50,
            100,
        );
        (store, service, owner)
    }

    #[tokio::test]
    async fn owner_creates_published_listing_with_slug() {
        let (_, service, owner) = setup().await;
        let listing = service
            .create(create_input("Habitación doble"), &actor(Role::Owner, Some(owner.id)))
            .await
            .unwrap();
        assert_eq!(listing.owner_id, owner.id);
        assert_eq!(listing.status, ListingStatus::Published);
        assert!(listing.slug.starts_with("surry-hills-habitacion-doble-"));

        let found = service.get_by_slug(&listing.slug).await.unwrap();
        assert_eq!(found.id, listing.id);
    }

    #[tokio::test]
    async fn short_title_and_foreign_owner_are_rejected() {
        let (_, service, owner) = setup().await;
        let err = service
            .create(create_input("ab"), &actor(Role::Owner, Some(owner.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let listing = service
            .create(create_input("Big room"), &actor(Role::Owner, Some(owner.id)))
            .await
            .unwrap();
        let stranger = actor(Role::Owner, Some(Uuid::new_v4()));
        assert!(matches!(service.get(listing.id, &stranger).await, Err(ServiceError::Forbidden(_))));
        assert!(service.list_all(AdminListingFilters::default(), &stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn public_search_filters_by_price() {
        let (_, service, owner) = setup().await;
        let owner_actor = actor(Role::Owner, Some(owner.id));
        service.create(create_input("Cheap room"), &owner_actor).await.unwrap();
        let mut pricey = create_input("Pricey room");
        pricey.price_per_week = Some(Decimal::new(600, 0));
        service.create(pricey, &owner_actor).await.unwrap();

        let hits = service
            .list_published(PublicListingFilters {
                max_price: Some(Decimal::new(400, 0)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Cheap room");
    }

    #[tokio::test]
    async fn upload_validates_before_touching_storage() {
        let (_, service, owner) = setup().await;
        let owner_actor = actor(Role::Owner, Some(owner.id));
        let pdf = ImageUpload {
            file_name: Some("lease.pdf".into()),
            content_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        };
        let err = service.upload_images(None, vec![pdf], &owner_actor).await.unwrap_err();
        assert_eq!(err.to_string(), "Only image files are allowed");

        let png = ImageUpload {
            file_name: Some("room.png".into()),
            content_type: "image/png".into(),
            bytes: vec![0; 16],
        };
        let err = service.upload_images(None, vec![png], &owner_actor).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::NotConfigured)));
    }

    #[test]
    fn location_accepts_geojson_and_plain_points() {
        let geo: LocationInput = serde_json::from_str(r#"{"type":"Point","coordinates":[151.2,-33.8]}"#).unwrap();
        let plain: LocationInput = serde_json::from_str(r#"{"lng":151.2,"lat":-33.8}"#).unwrap();
        assert_eq!(GeoPoint::from(geo), GeoPoint::from(plain));
    }
}

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend};
use crate::database::models::{Contract, Lead, Listing, Owner, Tenant, User};
use crate::database::DatabaseError;

pub mod memory;
pub mod postgres;
pub mod query;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{ContractOrder, ContractQuery, LeadQuery, ListingQuery, OwnerQuery, TenantQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            other => StoreError::Unexpected(other.into()),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => StoreError::NotFound(what),
            DatabaseError::Sqlx(e) => e.into(),
            other => StoreError::Unexpected(other.into()),
        }
    }
}

/// Persistence for the rental records. Every write replaces the whole record;
/// there is no multi-record transaction, callers sequence their own writes.
///
/// `get_*` returns `Ok(None)` for a missing id. `update_*` and `delete_*` on a
/// missing id return `StoreError::NotFound`. Unique keys (listing slug, owner
/// email, user email) surface as `StoreError::Conflict`.
#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn get_contract(&self, id: Uuid) -> StoreResult<Option<Contract>>;
    async fn list_contracts(&self, query: &ContractQuery) -> StoreResult<Vec<Contract>>;
    async fn count_contracts(&self, query: &ContractQuery) -> StoreResult<i64>;
    async fn insert_contract(&self, contract: Contract) -> StoreResult<Contract>;
    async fn update_contract(&self, contract: Contract) -> StoreResult<Contract>;
    async fn delete_contract(&self, id: Uuid) -> StoreResult<()>;

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>>;
    async fn list_tenants(&self, query: &TenantQuery) -> StoreResult<Vec<Tenant>>;
    async fn count_tenants(&self, query: &TenantQuery) -> StoreResult<i64>;
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant>;
    async fn update_tenant(&self, tenant: Tenant) -> StoreResult<Tenant>;
    async fn delete_tenant(&self, id: Uuid) -> StoreResult<()>;

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;
    async fn list_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>>;
    async fn count_listings(&self, query: &ListingQuery) -> StoreResult<i64>;
    async fn insert_listing(&self, listing: Listing) -> StoreResult<Listing>;
    async fn update_listing(&self, listing: Listing) -> StoreResult<Listing>;
    async fn delete_listing(&self, id: Uuid) -> StoreResult<()>;

    async fn get_owner(&self, id: Uuid) -> StoreResult<Option<Owner>>;
    async fn list_owners(&self, query: &OwnerQuery) -> StoreResult<Vec<Owner>>;
    async fn count_owners(&self, query: &OwnerQuery) -> StoreResult<i64>;
    async fn insert_owner(&self, owner: Owner) -> StoreResult<Owner>;
    async fn update_owner(&self, owner: Owner) -> StoreResult<Owner>;
    async fn delete_owner(&self, id: Uuid) -> StoreResult<()>;

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>>;
    async fn list_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>>;
    async fn count_leads(&self, query: &LeadQuery) -> StoreResult<i64>;
    async fn insert_lead(&self, lead: Lead) -> StoreResult<Lead>;
    async fn update_lead(&self, lead: Lead) -> StoreResult<Lead>;
    async fn delete_lead(&self, id: Uuid) -> StoreResult<()>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn update_user(&self, user: User) -> StoreResult<User>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Opens the backend named by `STORE_BACKEND`
pub async fn open(config: &AppConfig) -> StoreResult<Arc<dyn RentalStore>> {
    match config.server.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => Ok(Arc::new(PostgresStore::connect(&config.database).await?)),
    }
}

//! In-memory implementation of the rental store.
//!
//! # Purpose
//! Implements `RentalStore` with one `HashMap` per collection, each guarded by a
//! `tokio::sync::RwLock`. It backs local development (`STORE_BACKEND=memory`) and
//! the integration tests, which drive the real router without a database.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Each collection is locked independently. A coordinator write that touches a
//!   contract, a tenant and a listing takes three separate locks in sequence, so a
//!   concurrent reader can observe the intermediate state. This matches the
//!   Postgres backend, which also writes the three rows independently.
//!
//! # Unique keys
//! Listing `slug`, owner `email` and user `email` are checked under the write lock
//! and reported as `StoreError::Conflict`, mirroring the unique indexes in
//! `migrations/0001_init.sql`.
//!
//! # Ordering
//! Lists are sorted the same way the Postgres queries order them (newest first,
//! or by `end_date` for `ContractOrder::EndingFirst`), then offset and limit are
//! applied.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{ContractOrder, ContractQuery, LeadQuery, ListingQuery, OwnerQuery, TenantQuery};
use super::{RentalStore, StoreError, StoreResult};
use crate::database::models::{Contract, Lead, Listing, Owner, Tenant, User};

type Table<T> = Arc<RwLock<HashMap<Uuid, T>>>;

#[derive(Default)]
pub struct InMemoryStore {
    contracts: Table<Contract>,
    tenants: Table<Tenant>,
    listings: Table<Listing>,
    owners: Table<Owner>,
    leads: Table<Lead>,
    users: Table<User>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Records that can live in a `Table`.
trait Stored: Clone + Send + Sync {
    const KIND: &'static str;
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

macro_rules! stored {
    ($ty:ty, $kind:literal) => {
        impl Stored for $ty {
            const KIND: &'static str = $kind;
            fn id(&self) -> Uuid {
                self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

stored!(Contract, "contract");
stored!(Tenant, "tenant");
stored!(Listing, "listing");
stored!(Owner, "owner");
stored!(Lead, "lead");
stored!(User, "user");

async fn get<T: Stored>(table: &Table<T>, id: Uuid) -> StoreResult<Option<T>> {
    Ok(table.read().await.get(&id).cloned())
}

/// Matching records, newest first
async fn select<T: Stored>(table: &Table<T>, pred: impl Fn(&T) -> bool) -> Vec<T> {
    let guard = table.read().await;
    let mut items: Vec<T> = guard.values().filter(|item| pred(item)).cloned().collect();
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    items
}

fn page<T>(items: Vec<T>, limit: Option<i32>, offset: Option<i32>) -> Vec<T> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

async fn insert<T: Stored>(table: &Table<T>, item: T, unique: impl Fn(&T, &T) -> Option<String>) -> StoreResult<T> {
    let mut guard = table.write().await;
    if guard.contains_key(&item.id()) {
        return Err(StoreError::Conflict(format!("{} {} already exists", T::KIND, item.id())));
    }
    if let Some(msg) = guard.values().find_map(|existing| unique(existing, &item)) {
        return Err(StoreError::Conflict(msg));
    }
    guard.insert(item.id(), item.clone());
    Ok(item)
}

async fn update<T: Stored>(table: &Table<T>, item: T, unique: impl Fn(&T, &T) -> Option<String>) -> StoreResult<T> {
    let mut guard = table.write().await;
    if !guard.contains_key(&item.id()) {
        return Err(StoreError::NotFound(format!("{} {}", T::KIND, item.id())));
    }
    if let Some(msg) = guard
        .values()
        .filter(|existing| existing.id() != item.id())
        .find_map(|existing| unique(existing, &item))
    {
        return Err(StoreError::Conflict(msg));
    }
    guard.insert(item.id(), item.clone());
    Ok(item)
}

async fn delete<T: Stored>(table: &Table<T>, id: Uuid) -> StoreResult<()> {
    match table.write().await.remove(&id) {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(format!("{} {}", T::KIND, id))),
    }
}

fn no_unique<T>(_: &T, _: &T) -> Option<String> {
    None
}

fn unique_slug(existing: &Listing, new: &Listing) -> Option<String> {
    (existing.slug == new.slug).then(|| format!("listing slug {} already exists", new.slug))
}

fn unique_owner_email(existing: &Owner, new: &Owner) -> Option<String> {
    existing
        .email
        .eq_ignore_ascii_case(&new.email)
        .then(|| format!("owner email {} already exists", new.email))
}

fn unique_user_email(existing: &User, new: &User) -> Option<String> {
    existing
        .email
        .eq_ignore_ascii_case(&new.email)
        .then(|| format!("user email {} already exists", new.email))
}

#[async_trait]
impl RentalStore for InMemoryStore {
    async fn get_contract(&self, id: Uuid) -> StoreResult<Option<Contract>> {
        get(&self.contracts, id).await
    }

    async fn list_contracts(&self, query: &ContractQuery) -> StoreResult<Vec<Contract>> {
        let mut items = select(&self.contracts, |c| query.matches(c)).await;
        if query.order == ContractOrder::EndingFirst {
            items.sort_by(|a, b| a.end_date.cmp(&b.end_date));
        }
        Ok(page(items, query.limit, query.offset))
    }

    async fn count_contracts(&self, query: &ContractQuery) -> StoreResult<i64> {
        let guard = self.contracts.read().await;
        Ok(guard.values().filter(|c| query.matches(c)).count() as i64)
    }

    async fn insert_contract(&self, contract: Contract) -> StoreResult<Contract> {
        insert(&self.contracts, contract, no_unique).await
    }

    async fn update_contract(&self, contract: Contract) -> StoreResult<Contract> {
        update(&self.contracts, contract, no_unique).await
    }

    async fn delete_contract(&self, id: Uuid) -> StoreResult<()> {
        delete(&self.contracts, id).await
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        get(&self.tenants, id).await
    }

    async fn list_tenants(&self, query: &TenantQuery) -> StoreResult<Vec<Tenant>> {
        let items = select(&self.tenants, |t| query.matches(t)).await;
        Ok(page(items, query.limit, query.offset))
    }

    async fn count_tenants(&self, query: &TenantQuery) -> StoreResult<i64> {
        let guard = self.tenants.read().await;
        Ok(guard.values().filter(|t| query.matches(t)).count() as i64)
    }

    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        insert(&self.tenants, tenant, no_unique).await
    }

    async fn update_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        update(&self.tenants, tenant, no_unique).await
    }

    async fn delete_tenant(&self, id: Uuid) -> StoreResult<()> {
        delete(&self.tenants, id).await
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        get(&self.listings, id).await
    }

    async fn list_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>> {
        let items = select(&self.listings, |l| query.matches(l)).await;
        Ok(page(items, query.limit, query.offset))
    }

    async fn count_listings(&self, query: &ListingQuery) -> StoreResult<i64> {
        let guard = self.listings.read().await;
        Ok(guard.values().filter(|l| query.matches(l)).count() as i64)
    }

    async fn insert_listing(&self, listing: Listing) -> StoreResult<Listing> {
        insert(&self.listings, listing, unique_slug).await
    }

    async fn update_listing(&self, listing: Listing) -> StoreResult<Listing> {
        update(&self.listings, listing, unique_slug).await
    }

    async fn delete_listing(&self, id: Uuid) -> StoreResult<()> {
        delete(&self.listings, id).await
    }

    async fn get_owner(&self, id: Uuid) -> StoreResult<Option<Owner>> {
        get(&self.owners, id).await
    }

    async fn list_owners(&self, query: &OwnerQuery) -> StoreResult<Vec<Owner>> {
        let items = select(&self.owners, |o| query.matches(o)).await;
        Ok(page(items, query.limit, query.offset))
    }

    async fn count_owners(&self, query: &OwnerQuery) -> StoreResult<i64> {
        let guard = self.owners.read().await;
        Ok(guard.values().filter(|o| query.matches(o)).count() as i64)
    }

    async fn insert_owner(&self, owner: Owner) -> StoreResult<Owner> {
        insert(&self.owners, owner, unique_owner_email).await
    }

    async fn update_owner(&self, owner: Owner) -> StoreResult<Owner> {
        update(&self.owners, owner, unique_owner_email).await
    }

    async fn delete_owner(&self, id: Uuid) -> StoreResult<()> {
        delete(&self.owners, id).await
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        get(&self.leads, id).await
    }

    async fn list_leads(&self, query: &LeadQuery) -> StoreResult<Vec<Lead>> {
        let items = select(&self.leads, |l| query.matches(l)).await;
        Ok(page(items, query.limit, query.offset))
    }

    async fn count_leads(&self, query: &LeadQuery) -> StoreResult<i64> {
        let guard = self.leads.read().await;
        Ok(guard.values().filter(|l| query.matches(l)).count() as i64)
    }

    async fn insert_lead(&self, lead: Lead) -> StoreResult<Lead> {
        insert(&self.leads, lead, no_unique).await
    }

    async fn update_lead(&self, lead: Lead) -> StoreResult<Lead> {
        update(&self.leads, lead, no_unique).await
    }

    async fn delete_lead(&self, id: Uuid) -> StoreResult<()> {
        delete(&self.leads, id).await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        get(&self.users, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let guard = self.users.read().await;
        Ok(guard.values().find(|u| u.email.eq_ignore_ascii_case(email.trim())).cloned())
    }

    async fn find_user_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<User>> {
        let guard = self.users.read().await;
        Ok(guard.values().find(|u| u.owner_id == Some(owner_id)).cloned())
    }

    async fn find_user_by_tenant(&self, tenant_id: Uuid) -> StoreResult<Option<User>> {
        let guard = self.users.read().await;
        Ok(guard.values().find(|u| u.tenant_id == Some(tenant_id)).cloned())
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        insert(&self.users, user, unique_user_email).await
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        update(&self.users, user, unique_user_email).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth_service::{deactivate_account, provision_account, AccountInfo, AccountLink};
use super::{is_valid_email, ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::models::{Owner, OwnerStatus, Role};
use crate::store::{ListingQuery, OwnerQuery, RentalStore, StoreError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerFilters {
    pub status: Option<OwnerStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOwner {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<OwnerStatus>,
    #[serde(default)]
    pub create_user_account: bool,
    pub user_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOwner {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: Option<OwnerStatus>,
}

pub struct OwnerService {
    store: Arc<dyn RentalStore>,
    hash_cost: u32,
}

impl OwnerService {
    pub fn new(store: Arc<dyn RentalStore>, hash_cost: u32) -> Self {
        Self { store, hash_cost }
    }

    pub async fn list(&self, filters: OwnerFilters, actor: &AuthUser) -> ServiceResult<Vec<Owner>> {
        match actor.role {
            Role::Manager => {
                let query = OwnerQuery {
                    status: filters.status,
                    ..Default::default()
                };
                Ok(self.store.list_owners(&query).await?)
            }
            // Owners only ever see their own record
            Role::Owner => {
                let own = match actor.owner_id {
                    Some(id) => self.store.get_owner(id).await?,
                    None => None,
                };
                Ok(own
                    .into_iter()
                    .filter(|o| filters.status.map_or(true, |s| o.status == s))
                    .collect())
            }
            Role::Tenant => Err(ServiceError::forbidden("Tenants cannot view owners")),
        }
    }

    pub async fn get(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<Owner> {
        let allowed = match actor.role {
            Role::Manager => true,
            Role::Owner => actor.owner_id == Some(id),
            Role::Tenant => false,
        };
        if !allowed {
            return Err(ServiceError::forbidden("Not authorized to view this owner"));
        }
        self.load(id).await
    }

    /// Returns the owner and, when requested, the outcome of creating its login.
    pub async fn create(&self, input: CreateOwner, actor: &AuthUser) -> ServiceResult<(Owner, Option<AccountInfo>)> {
        ensure_manager(actor)?;
        validate(&input.name, &input.email)?;

        let now = Utc::now();
        let owner = Owner {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            company: input.company,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let owner = self.store.insert_owner(owner).await.map_err(email_taken)?;
        info!(owner_id = %owner.id, email = %owner.email, "owner created");

        // A login is only provisioned when the caller chose its password
        let password = input.user_password.filter(|p| !p.is_empty());
        let account = match (input.create_user_account, password) {
            (true, Some(password)) => Some(
                provision_account(
                    self.store.as_ref(),
                    AccountLink::Owner(owner.id),
                    &owner.email,
                    &owner.name,
                    owner.phone.clone(),
                    Some(password),
                    self.hash_cost,
                )
                .await,
            ),
            _ => None,
        };
        Ok((owner, account))
    }

    pub async fn update(&self, id: Uuid, patch: UpdateOwner, actor: &AuthUser) -> ServiceResult<Owner> {
        ensure_manager(actor)?;
        let mut owner = self.load(id).await?;

        if let Some(name) = patch.name {
            if name.trim().chars().count() < 2 {
                return Err(ServiceError::validation("name must be at least 2 characters"));
            }
            owner.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            if !is_valid_email(&email) {
                return Err(ServiceError::validation("Invalid email address"));
            }
            owner.email = email.trim().to_lowercase();
        }
        if let Some(phone) = patch.phone {
            owner.phone = Some(phone);
        }
        if let Some(company) = patch.company {
            owner.company = Some(company);
        }
        if let Some(status) = patch.status {
            owner.status = status;
        }
        owner.updated_at = Utc::now();

        Ok(self.store.update_owner(owner).await.map_err(email_taken)?)
    }

    pub async fn set_status(&self, id: Uuid, status: OwnerStatus, actor: &AuthUser) -> ServiceResult<Owner> {
        ensure_manager(actor)?;
        let mut owner = self.load(id).await?;
        owner.status = status;
        owner.updated_at = Utc::now();
        let owner = self.store.update_owner(owner).await?;
        info!(owner_id = %id, status = %status, "owner status changed");
        Ok(owner)
    }

    /// Refused while any listing still references the owner. The owner's login is
    /// deactivated rather than removed.
    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<()> {
        ensure_manager(actor)?;
        let owner = self.load(id).await?;

        let listings = self
            .store
            .count_listings(&ListingQuery {
                owner_id: Some(id),
                ..Default::default()
            })
            .await?;
        if listings > 0 {
            return Err(ServiceError::Validation(format!(
                "Cannot delete owner with {} active listing(s). Please delete or reassign the listings first.",
                listings
            )));
        }

        if let Err(err) = deactivate_account(self.store.as_ref(), AccountLink::Owner(id)).await {
            warn!(owner_id = %id, error = %err, "failed to deactivate owner user account");
        }
        self.store.delete_owner(id).await?;
        info!(owner_id = %id, email = %owner.email, "owner deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Owner> {
        self.store
            .get_owner(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Owner not found"))
    }
}

fn ensure_manager(actor: &AuthUser) -> ServiceResult<()> {
    if !actor.is_manager() {
        return Err(ServiceError::forbidden("Only managers can manage owners"));
    }
    Ok(())
}

fn validate(name: &str, email: &str) -> ServiceResult<()> {
    if name.trim().chars().count() < 2 {
        return Err(ServiceError::validation("name must be at least 2 characters"));
    }
    if !is_valid_email(email) {
        return Err(ServiceError::validation("Invalid email address"));
    }
    Ok(())
}

fn email_taken(err: StoreError) -> ServiceError {
    match err {
        StoreError::Conflict(_) => ServiceError::validation("Email already exists"),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Listing, ListingStatus};
    use crate::store::InMemoryStore;

    fn manager() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "manager@example.com".into(),
            role: Role::Manager,
            owner_id: None,
            tenant_id: None,
        }
    }

    fn input(email: &str) -> CreateOwner {
        CreateOwner {
            name: "Olive Owner".into(),
            email: email.into(),
            phone: None,
            company: None,
            status: None,
            create_user_account: true,
            user_password: Some("owner-pass".into()),
        }
    }

    #[tokio::test]
    async fn create_provisions_login_and_rejects_duplicate_email() {
        let store = Arc::new(InMemoryStore::new());
        let service = OwnerService::new(store.clone(), 4);

        let (owner, account) = service.create(input("olive@example.com"), &manager()).await.unwrap();
        assert_eq!(owner.status, OwnerStatus::Active);
        assert_eq!(account.unwrap().role, Some(Role::Owner));
        let user = store.find_user_by_owner(owner.id).await.unwrap().unwrap();
        assert_eq!(user.email, "olive@example.com");

        let err = service.create(input("OLIVE@example.com"), &manager()).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[tokio::test]
    async fn delete_refused_while_listings_remain() {
        let store = Arc::new(InMemoryStore::new());
        let service = OwnerService::new(store.clone(), 4);
        let (owner, _) = service.create(input("olive@example.com"), &manager()).await.unwrap();

        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            title: "Room".into(),
            slug: "room-1".into(),
            address: "1 Long Rd".into(),
            suburb: None,
            location: None,
            room_type: None,
            price_per_week: None,
            bond: None,
            bills_included: true,
            available_from: None,
            min_term_weeks: 12,
            preferred_tenants: vec![],
            house_features: vec![],
            rules: vec![],
            images: vec![],
            owner_id: owner.id,
            status: ListingStatus::Published,
            tenant_id: None,
            locale: Default::default(),
            created_at: now,
            updated_at: now,
        };
        store.insert_listing(listing.clone()).await.unwrap();
        let err = service.delete(owner.id, &manager()).await.unwrap_err();
        assert!(err.to_string().starts_with("Cannot delete owner with 1 active listing(s)"));

        store.delete_listing(listing.id).await.unwrap();
        service.delete(owner.id, &manager()).await.unwrap();
        let user = store.find_user_by_email("olive@example.com").await.unwrap().unwrap();
        assert!(!user.is_active);
        assert_eq!(user.owner_id, None);
    }

    #[tokio::test]
    async fn owners_cannot_write_owner_records() {
        let store = Arc::new(InMemoryStore::new());
        let service = OwnerService::new(store.clone(), 4);
        let owner_actor = AuthUser {
            role: Role::Owner,
            owner_id: Some(Uuid::new_v4()),
            ..manager()
        };
        let err = service.create(input("x@example.com"), &owner_actor).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}

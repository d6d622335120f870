//! Contract status coordinator.
//!
//! Every contract write goes through `ContractService::save`, which
//!
//! 1. recomputes the status from `end_date` (`active` inside the ending-soon window
//!    becomes `ending_soon`, an active-like lease past its end becomes `ended`),
//! 2. settles the planned cross-record effect against that recomputed status,
//! 3. writes the contract, then
//! 4. applies the effect to the linked listing and tenant.
//!
//! Step 4 is a sequence of independent store writes. A failure part way through
//! leaves the contract saved and the links stale; nothing is rolled back.
//!
//! Conflict checks run before any write: a listing holds at most one contract in
//! an open status (`draft`, `available`, `active`, `ending_soon`) and a tenant holds
//! at most one active-like contract. The checks are not atomic with the write.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ListingSummary, OwnerSummary, ServiceError, ServiceResult, TenantSummary};
use crate::auth::AuthUser;
use crate::config::ContractConfig;
use crate::database::models::{
    flexible_date, Contract, ContractDocument, ContractStatus, ContractTerms, DocumentType, LinkEffect,
    PaymentFrequency, Role, TransitionError, TransitionPlan,
};
use crate::store::{ContractQuery, RentalStore};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContract {
    pub listing_id: Uuid,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(deserialize_with = "flexible_date::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_date::deserialize")]
    pub end_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub signed_date: Option<DateTime<Utc>>,
    pub weekly_rent: Decimal,
    pub bond_amount: Decimal,
    #[serde(default)]
    pub bond_paid: bool,
    #[serde(default)]
    pub payment_frequency: Option<PaymentFrequency>,
    #[serde(default)]
    pub notice_period_days: Option<i32>,
    #[serde(default)]
    pub bills_included: Option<bool>,
    #[serde(default)]
    pub terms: ContractTerms,
    #[serde(default)]
    pub status: Option<ContractStatus>,
}

/// Partial update. `status` is routed through the transition rules; the
/// listing and tenant references are changed only through `assign_tenant`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContract {
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub signed_date: Option<DateTime<Utc>>,
    pub notice_period_days: Option<i32>,
    pub weekly_rent: Option<Decimal>,
    pub bond_amount: Option<Decimal>,
    pub bond_paid: Option<bool>,
    pub payment_frequency: Option<PaymentFrequency>,
    pub bills_included: Option<bool>,
    pub terms: Option<ContractTerms>,
    pub status: Option<ContractStatus>,
    pub termination_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub name: String,
    pub url: String,
}

/// Query-string filters for the contract list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilters {
    pub status: Option<ContractStatus>,
    pub tenant_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

/// A contract as returned by the API: the stored record plus derived lease
/// figures and the linked records.
#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub days_remaining: i64,
    pub is_ending_soon: bool,
    pub tenant: Option<TenantSummary>,
    pub listing: Option<ListingSummary>,
    pub owner: Option<OwnerSummary>,
}

pub struct ContractService {
    store: Arc<dyn RentalStore>,
    settings: ContractConfig,
}

impl ContractService {
    pub fn new(store: Arc<dyn RentalStore>, settings: ContractConfig) -> Self {
        Self { store, settings }
    }

    pub async fn list(&self, filters: ContractFilters, actor: &AuthUser) -> ServiceResult<Vec<ContractView>> {
        let mut query = ContractQuery::default();
        match actor.role {
            Role::Owner => {
                let owner_id = actor
                    .owner_id
                    .ok_or_else(|| ServiceError::validation("Owner must have an owner_id"))?;
                query.owner_id = Some(owner_id);
            }
            Role::Tenant => {
                let tenant_id = actor
                    .tenant_id
                    .ok_or_else(|| ServiceError::validation("Tenant must have a tenant_id"))?;
                query.tenant_id = Some(tenant_id);
            }
            Role::Manager => {}
        }

        // Filters narrow the role scope, never widen it
        if !narrow(&mut query.owner_id, filters.owner_id) || !narrow(&mut query.tenant_id, filters.tenant_id) {
            return Ok(vec![]);
        }
        query.listing_id = filters.listing_id;
        if let Some(status) = filters.status {
            query.statuses = vec![status];
        }

        let contracts = self.store.list_contracts(&query).await?;
        self.views(contracts).await
    }

    pub async fn get(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<ContractView> {
        let contract = self.load(id).await?;
        ensure_can_read(&contract, actor)?;
        self.view(contract).await
    }

    pub async fn create(&self, input: CreateContract, actor: &AuthUser) -> ServiceResult<ContractView> {
        if actor.is_tenant() {
            return Err(ServiceError::forbidden("Tenants cannot create contracts"));
        }

        let listing = self
            .store
            .get_listing(input.listing_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Listing not found"))?;
        if actor.is_owner() && actor.owner_id != Some(listing.owner_id) {
            return Err(ServiceError::forbidden("Not authorized to create contract for this property"));
        }

        let status = input.status.unwrap_or_default();
        if !matches!(status, ContractStatus::Draft | ContractStatus::Available | ContractStatus::Active) {
            return Err(ServiceError::validation(
                "Contracts can only be created as draft, available or active",
            ));
        }
        let plan = TransitionPlan::plan(ContractStatus::Draft, status, input.tenant_id.is_some())?;

        if let Some(tenant_id) = input.tenant_id {
            if self.store.get_tenant(tenant_id).await?.is_none() {
                return Err(ServiceError::not_found("Tenant not found"));
            }
            self.ensure_tenant_free(tenant_id, None).await?;
        }
        self.ensure_listing_free(listing.id, None).await?;
        validate_terms(input.start_date, input.end_date, input.weekly_rent, input.bond_amount)?;

        let now = Utc::now();
        let mut contract = Contract {
            id: Uuid::new_v4(),
            listing_id: listing.id,
            tenant_id: input.tenant_id,
            owner_id: listing.owner_id,
            signed_date: Some(input.signed_date.unwrap_or(now)),
            start_date: input.start_date,
            end_date: input.end_date,
            notice_period_days: input
                .notice_period_days
                .unwrap_or(self.settings.default_notice_period_days),
            weekly_rent: input.weekly_rent,
            bond_amount: input.bond_amount,
            bond_paid: input.bond_paid,
            payment_frequency: input.payment_frequency.unwrap_or_default(),
            bills_included: input.bills_included.unwrap_or(true),
            status: ContractStatus::Draft,
            termination_reason: None,
            termination_date: None,
            documents: vec![],
            terms: input.terms,
            created_by: Some(actor.user_id),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        contract.apply_plan(&plan, now);

        let saved = self.save(contract, ContractStatus::Draft, plan.links, true).await?;
        info!(contract_id = %saved.id, listing_id = %saved.listing_id, status = %saved.status, "contract created");
        self.view(saved).await
    }

    pub async fn update(&self, id: Uuid, patch: UpdateContract, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        ensure_can_write(&contract, actor)?;
        let stored = contract.status;

        if let Some(v) = patch.start_date {
            contract.start_date = v;
        }
        if let Some(v) = patch.end_date {
            contract.end_date = v;
        }
        if let Some(v) = patch.signed_date {
            contract.signed_date = Some(v);
        }
        if let Some(v) = patch.notice_period_days {
            contract.notice_period_days = v;
        }
        if let Some(v) = patch.weekly_rent {
            contract.weekly_rent = v;
        }
        if let Some(v) = patch.bond_amount {
            contract.bond_amount = v;
        }
        if let Some(v) = patch.bond_paid {
            contract.bond_paid = v;
        }
        if let Some(v) = patch.payment_frequency {
            contract.payment_frequency = v;
        }
        if let Some(v) = patch.bills_included {
            contract.bills_included = v;
        }
        if let Some(v) = patch.terms {
            contract.terms = v;
        }
        validate_terms(contract.start_date, contract.end_date, contract.weekly_rent, contract.bond_amount)?;

        let mut planned = LinkEffect::None;
        if let Some(to) = patch.status.filter(|to| *to != stored) {
            let plan = TransitionPlan::plan(stored, to, contract.tenant_id.is_some())?;
            self.check_plan(&contract, &plan).await?;
            contract.apply_plan(&plan, Utc::now());
            planned = plan.links;
            info!(contract_id = %contract.id, from = %stored, to = %to, "contract status change requested");
        }
        if let Some(reason) = patch.termination_reason {
            contract.termination_reason = Some(reason);
        }
        contract.updated_by = Some(actor.user_id);

        let saved = self.save(contract, stored, planned, false).await?;
        self.view(saved).await
    }

    /// Status-only update
    pub async fn transition(&self, id: Uuid, to: ContractStatus, actor: &AuthUser) -> ServiceResult<ContractView> {
        let patch = UpdateContract {
            status: Some(to),
            ..Default::default()
        };
        self.update(id, patch, actor).await
    }

    pub async fn assign_tenant(&self, id: Uuid, tenant_id: Uuid, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        if contract.tenant_id.is_some() {
            return Err(ServiceError::validation("Contract already has a tenant assigned"));
        }
        ensure_can_write(&contract, actor)?;

        if self.store.get_tenant(tenant_id).await?.is_none() {
            return Err(ServiceError::not_found("Tenant not found"));
        }
        self.ensure_tenant_free(tenant_id, Some(contract.id)).await?;

        contract.tenant_id = Some(tenant_id);
        contract.updated_by = Some(actor.user_id);
        let stored = contract.status;
        let planned = if stored.is_active_like() { LinkEffect::Link } else { LinkEffect::None };

        let saved = self.save(contract, stored, planned, false).await?;
        info!(contract_id = %saved.id, tenant_id = %tenant_id, "tenant assigned to contract");
        self.view(saved).await
    }

    pub async fn terminate(&self, id: Uuid, reason: Option<String>, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        ensure_can_write(&contract, actor)?;
        let stored = contract.status;

        let plan = TransitionPlan::terminate(stored).map_err(|e| match e {
            TransitionError::AlreadyClosed(_) => ServiceError::validation("Contract is already terminated"),
            other => other.into(),
        })?;
        contract.apply_plan(&plan, Utc::now());
        contract.termination_reason = reason.filter(|r| !r.trim().is_empty());
        contract.updated_by = Some(actor.user_id);

        let saved = self.save(contract, stored, plan.links, false).await?;
        info!(contract_id = %saved.id, from = %stored, "contract terminated");
        self.view(saved).await
    }

    pub async fn restart(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        ensure_can_write(&contract, actor)?;
        let stored = contract.status;

        let plan = TransitionPlan::restart(stored, contract.tenant_id.is_some())?;
        self.check_plan(&contract, &plan).await?;
        contract.apply_plan(&plan, Utc::now());
        contract.updated_by = Some(actor.user_id);

        let saved = self.save(contract, stored, plan.links, false).await?;
        info!(contract_id = %saved.id, status = %saved.status, "contract restarted");
        self.view(saved).await
    }

    /// Renewal draft on the same listing: same money and terms, no tenant, starting
    /// where the source ends and running for the same length.
    pub async fn duplicate(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<ContractView> {
        let source = self.load(id).await?;
        ensure_can_write(&source, actor)?;
        self.ensure_listing_free(source.listing_id, None).await?;

        let now = Utc::now();
        let start = source.end_date;
        let copy = Contract {
            id: Uuid::new_v4(),
            tenant_id: None,
            signed_date: None,
            start_date: start,
            end_date: start + source.term_length(),
            status: ContractStatus::Draft,
            termination_reason: None,
            termination_date: None,
            documents: vec![],
            bond_paid: false,
            created_by: Some(actor.user_id),
            updated_by: None,
            created_at: now,
            updated_at: now,
            ..source
        };

        let saved = self.save(copy, ContractStatus::Draft, LinkEffect::None, true).await?;
        info!(contract_id = %saved.id, source_id = %id, "contract duplicated");
        self.view(saved).await
    }

    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<()> {
        let contract = self.load(id).await?;
        if !actor.is_manager() {
            return Err(ServiceError::forbidden("Only managers can delete contracts"));
        }
        if contract.status != ContractStatus::Draft {
            return Err(ServiceError::validation(
                "Only draft contracts can be deleted. Terminate active contracts instead.",
            ));
        }
        self.store.delete_contract(id).await?;
        info!(contract_id = %id, "contract deleted");
        Ok(())
    }

    pub async fn add_document(&self, id: Uuid, doc: NewDocument, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        ensure_can_write(&contract, actor)?;
        if doc.name.trim().is_empty() || doc.url.trim().is_empty() {
            return Err(ServiceError::validation("Document name and url are required"));
        }

        contract.documents.push(ContractDocument {
            id: Uuid::new_v4(),
            doc_type: doc.doc_type,
            name: doc.name,
            url: doc.url,
            uploaded_at: Utc::now(),
            uploaded_by: Some(actor.user_id),
        });
        contract.updated_by = Some(actor.user_id);

        let stored = contract.status;
        let saved = self.save(contract, stored, LinkEffect::None, false).await?;
        self.view(saved).await
    }

    pub async fn remove_document(&self, id: Uuid, document_id: Uuid, actor: &AuthUser) -> ServiceResult<ContractView> {
        let mut contract = self.load(id).await?;
        ensure_can_write(&contract, actor)?;

        let before = contract.documents.len();
        contract.documents.retain(|d| d.id != document_id);
        if contract.documents.len() == before {
            return Err(ServiceError::not_found("Document not found"));
        }
        contract.updated_by = Some(actor.user_id);

        let stored = contract.status;
        let saved = self.save(contract, stored, LinkEffect::None, false).await?;
        self.view(saved).await
    }

    /// The tenant's active-like contract, if any
    pub async fn active_for_tenant(&self, tenant_id: Uuid) -> ServiceResult<Option<Contract>> {
        let query = ContractQuery {
            limit: Some(1),
            ..ContractQuery::for_tenant(tenant_id).with_statuses(&ContractStatus::ACTIVE_LIKE)
        };
        Ok(self.store.list_contracts(&query).await?.into_iter().next())
    }

    pub async fn view(&self, contract: Contract) -> ServiceResult<ContractView> {
        let now = Utc::now();
        let tenant = match contract.tenant_id {
            Some(id) => self.store.get_tenant(id).await?.as_ref().map(TenantSummary::from),
            None => None,
        };
        let listing = self.store.get_listing(contract.listing_id).await?;
        let owner = self.store.get_owner(contract.owner_id).await?;

        Ok(ContractView {
            days_remaining: contract.days_remaining_at(now),
            is_ending_soon: contract.is_ending_soon_at(now, self.settings.ending_soon_days),
            tenant,
            listing: listing.as_ref().map(ListingSummary::from),
            owner: owner.as_ref().map(OwnerSummary::from),
            contract,
        })
    }

    pub async fn views(&self, contracts: Vec<Contract>) -> ServiceResult<Vec<ContractView>> {
        let mut views = Vec::with_capacity(contracts.len());
        for contract in contracts {
            views.push(self.view(contract).await?);
        }
        Ok(views)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Contract> {
        self.store
            .get_contract(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contract not found"))
    }

    /// Conflict checks for a planned status change
    async fn check_plan(&self, contract: &Contract, plan: &TransitionPlan) -> ServiceResult<()> {
        if plan.reopens {
            self.ensure_listing_free(contract.listing_id, Some(contract.id)).await?;
        }
        if plan.to.is_active_like() && !plan.from.is_active_like() {
            if let Some(tenant_id) = contract.tenant_id {
                self.ensure_tenant_free(tenant_id, Some(contract.id)).await?;
            }
        }
        Ok(())
    }

    async fn ensure_listing_free(&self, listing_id: Uuid, except: Option<Uuid>) -> ServiceResult<()> {
        let mut query = ContractQuery::for_listing(listing_id).with_statuses(&ContractStatus::OPEN);
        query.exclude_id = except;
        query.limit = Some(1);

        if let Some(existing) = self.store.list_contracts(&query).await?.into_iter().next() {
            warn!(listing_id = %listing_id, existing = %existing.id, status = %existing.status, "listing already has an open contract");
            let message = if existing.status.is_active_like() {
                "This property already has an active contract".to_string()
            } else {
                format!("This property already has a {} contract", existing.status)
            };
            return Err(ServiceError::Validation(message));
        }
        Ok(())
    }

    async fn ensure_tenant_free(&self, tenant_id: Uuid, except: Option<Uuid>) -> ServiceResult<()> {
        let mut query = ContractQuery::for_tenant(tenant_id).with_statuses(&ContractStatus::ACTIVE_LIKE);
        query.exclude_id = except;
        query.limit = Some(1);

        if let Some(existing) = self.store.list_contracts(&query).await?.into_iter().next() {
            warn!(tenant_id = %tenant_id, existing = %existing.id, "tenant already has an active contract");
            return Err(ServiceError::validation("This tenant already has an active contract"));
        }
        Ok(())
    }

    /// Save-time pipeline shared by every contract write
    async fn save(
        &self,
        mut contract: Contract,
        stored: ContractStatus,
        planned: LinkEffect,
        is_new: bool,
    ) -> ServiceResult<Contract> {
        let now = Utc::now();
        if let Some(next) = contract.refresh_status_at(now, self.settings.ending_soon_days) {
            info!(contract_id = %contract.id, status = %next, "contract status recomputed from end date");
        }
        contract.updated_at = now;

        let effect = planned.settle(stored, contract.status);
        let saved = if is_new {
            self.store.insert_contract(contract).await?
        } else {
            self.store.update_contract(contract).await?
        };
        self.apply_links(&saved, effect).await?;
        Ok(saved)
    }

    async fn apply_links(&self, contract: &Contract, effect: LinkEffect) -> ServiceResult<()> {
        match effect {
            LinkEffect::None => {}
            LinkEffect::Link => {
                let Some(tenant_id) = contract.tenant_id else {
                    return Ok(());
                };
                if let Some(mut listing) = self.store.get_listing(contract.listing_id).await? {
                    listing.reserve_for(tenant_id);
                    self.store.update_listing(listing).await?;
                }
                if let Some(mut tenant) = self.store.get_tenant(tenant_id).await? {
                    tenant.current_contract_id = Some(contract.id);
                    tenant.status = contract.status.tenant_status();
                    tenant.updated_at = Utc::now();
                    self.store.update_tenant(tenant).await?;
                }
                info!(contract_id = %contract.id, tenant_id = %tenant_id, "listing reserved and tenant linked");
            }
            LinkEffect::Release => {
                if let Some(mut listing) = self.store.get_listing(contract.listing_id).await? {
                    listing.release();
                    self.store.update_listing(listing).await?;
                }
                if let Some(tenant_id) = contract.tenant_id {
                    if let Some(mut tenant) = self.store.get_tenant(tenant_id).await? {
                        if tenant.current_contract_id.map_or(true, |id| id == contract.id) {
                            tenant.release();
                            self.store.update_tenant(tenant).await?;
                        }
                    }
                }
                info!(contract_id = %contract.id, status = %contract.status, "listing and tenant released");
            }
            LinkEffect::Mirror => {
                if let Some(tenant_id) = contract.tenant_id {
                    if let Some(mut tenant) = self.store.get_tenant(tenant_id).await? {
                        if tenant.current_contract_id == Some(contract.id) {
                            tenant.status = contract.status.tenant_status();
                            tenant.updated_at = Utc::now();
                            self.store.update_tenant(tenant).await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Sets `scope` from `filter` when unscoped. Returns false when the filter asks
/// for something outside the scope.
fn narrow(scope: &mut Option<Uuid>, filter: Option<Uuid>) -> bool {
    match (*scope, filter) {
        (Some(s), Some(f)) => s == f,
        (None, Some(f)) => {
            *scope = Some(f);
            true
        }
        _ => true,
    }
}

fn ensure_can_read(contract: &Contract, actor: &AuthUser) -> ServiceResult<()> {
    let allowed = match actor.role {
        Role::Manager => true,
        Role::Owner => actor.owner_id == Some(contract.owner_id),
        Role::Tenant => actor.tenant_id.is_some() && actor.tenant_id == contract.tenant_id,
    };
    if !allowed {
        return Err(ServiceError::forbidden("Not authorized to view this contract"));
    }
    Ok(())
}

fn ensure_can_write(contract: &Contract, actor: &AuthUser) -> ServiceResult<()> {
    match actor.role {
        Role::Manager => Ok(()),
        Role::Owner if actor.owner_id == Some(contract.owner_id) => Ok(()),
        Role::Owner => Err(ServiceError::forbidden("Not authorized to modify this contract")),
        Role::Tenant => Err(ServiceError::forbidden("Tenants cannot modify contracts")),
    }
}

fn validate_terms(start: DateTime<Utc>, end: DateTime<Utc>, rent: Decimal, bond: Decimal) -> ServiceResult<()> {
    if end <= start {
        return Err(ServiceError::validation("end_date must be after start_date"));
    }
    if rent.is_sign_negative() || bond.is_sign_negative() {
        return Err(ServiceError::validation("weekly_rent and bond_amount cannot be negative"));
    }
    Ok(())
}

/// Default lease window used when a contract is created on someone's behalf
pub fn default_lease(settings: &ContractConfig, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(settings.default_lease_months as i64 * 30))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Listing, ListingStatus, Tenant, TenantStatus};
    use crate::store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: ContractService,
        manager: AuthUser,
        listing: Listing,
        tenant: Tenant,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner_id = Uuid::new_v4();
        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            title: "Sunny double".into(),
            slug: format!("room-sunny-double-{}", now.timestamp_millis()),
            address: "10 King St".into(),
            suburb: Some("Newtown".into()),
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
            owner_id,
            status: ListingStatus::Published,
            tenant_id: None,
            locale: Default::default(),
            created_at: now,
            updated_at: now,
        };
        let tenant = Tenant::new("Ana".into(), "ana@example.com".into(), owner_id);
        store.insert_listing(listing.clone()).await.unwrap();
        store.insert_tenant(tenant.clone()).await.unwrap();

        let dyn_store: Arc<dyn RentalStore> = store.clone();
        Fixture {
            service: ContractService::new(dyn_store, ContractConfig::default()),
            store,
            manager: AuthUser {
                user_id: Uuid::new_v4(),
                email: "manager@example.com".into(),
                role: Role::Manager,
                owner_id: None,
                tenant_id: None,
            },
            listing,
            tenant,
        }
    }

    fn input(f: &Fixture, tenant: Option<Uuid>, status: ContractStatus, days: i64) -> CreateContract {
        let now = Utc::now();
        CreateContract {
            listing_id: f.listing.id,
            tenant_id: tenant,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(days),
            signed_date: None,
            weekly_rent: Decimal::new(300, 0),
            bond_amount: Decimal::new(1200, 0),
            bond_paid: false,
            payment_frequency: None,
            notice_period_days: None,
            bills_included: None,
            terms: ContractTerms::default(),
            status: Some(status),
        }
    }

    #[tokio::test]
    async fn active_create_links_listing_and_tenant() {
        let f = fixture().await;
        let view = f
            .service
            .create(input(&f, Some(f.tenant.id), ContractStatus::Active, 120), &f.manager)
            .await
            .unwrap();

        let listing = f.store.get_listing(f.listing.id).await.unwrap().unwrap();
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Reserved);
        assert_eq!(listing.tenant_id, Some(f.tenant.id));
        assert_eq!(tenant.current_contract_id, Some(view.contract.id));
        assert_eq!(tenant.status, TenantStatus::Active);
        assert_eq!(view.contract.notice_period_days, 14);
        assert_eq!(view.tenant.unwrap().id, f.tenant.id);
    }

    #[tokio::test]
    async fn activating_without_tenant_fails_without_side_effects() {
        let f = fixture().await;
        let err = f
            .service
            .create(input(&f, None, ContractStatus::Active, 120), &f.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(f.store.count_contracts(&ContractQuery::default()).await.unwrap(), 0);

        let draft = f
            .service
            .create(input(&f, None, ContractStatus::Draft, 120), &f.manager)
            .await
            .unwrap();
        let err = f
            .service
            .transition(draft.contract.id, ContractStatus::Active, &f.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let stored = f.store.get_contract(draft.contract.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Draft);
        let listing = f.store.get_listing(f.listing.id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Published);
    }

    #[tokio::test]
    async fn second_open_contract_on_listing_is_rejected() {
        let f = fixture().await;
        f.service
            .create(input(&f, None, ContractStatus::Draft, 120), &f.manager)
            .await
            .unwrap();
        let err = f
            .service
            .create(input(&f, None, ContractStatus::Available, 120), &f.manager)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This property already has a draft contract");
    }

    #[tokio::test]
    async fn terminate_then_restart_round_trips_links() {
        let f = fixture().await;
        let created = f
            .service
            .create(input(&f, Some(f.tenant.id), ContractStatus::Active, 120), &f.manager)
            .await
            .unwrap();
        let id = created.contract.id;

        let ended = f
            .service
            .terminate(id, Some("Moved out".into()), &f.manager)
            .await
            .unwrap();
        assert_eq!(ended.contract.status, ContractStatus::Terminated);
        assert!(ended.contract.termination_date.is_some());
        let listing = f.store.get_listing(f.listing.id).await.unwrap().unwrap();
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Published);
        assert_eq!(listing.tenant_id, None);
        assert_eq!(tenant.current_contract_id, None);
        assert_eq!(tenant.status, TenantStatus::Ended);

        let again = f.service.terminate(id, None, &f.manager).await.unwrap_err();
        assert!(matches!(again, ServiceError::Validation(_)));

        let restarted = f.service.restart(id, &f.manager).await.unwrap();
        assert_eq!(restarted.contract.status, ContractStatus::Active);
        assert_eq!(restarted.contract.termination_date, None);
        assert_eq!(restarted.contract.termination_reason, None);
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.current_contract_id, Some(id));
    }

    #[tokio::test]
    async fn save_downgrades_to_ending_soon_and_mirrors_tenant() {
        let f = fixture().await;
        let view = f
            .service
            .create(input(&f, Some(f.tenant.id), ContractStatus::Active, 10), &f.manager)
            .await
            .unwrap();
        assert_eq!(view.contract.status, ContractStatus::EndingSoon);
        assert!((9..=10).contains(&view.days_remaining));
        assert!(view.is_ending_soon);
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.status, TenantStatus::EndingSoon);

        // pushing the end date out again flips both back to active
        let patch = UpdateContract {
            end_date: Some(Utc::now() + Duration::days(200)),
            status: Some(ContractStatus::Active),
            ..Default::default()
        };
        let view = f.service.update(view.contract.id, patch, &f.manager).await.unwrap();
        assert_eq!(view.contract.status, ContractStatus::Active);
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.status, TenantStatus::Active);
    }

    #[tokio::test]
    async fn tenants_cannot_write_and_owners_are_scoped() {
        let f = fixture().await;
        let created = f
            .service
            .create(input(&f, None, ContractStatus::Draft, 120), &f.manager)
            .await
            .unwrap();

        let other_owner = AuthUser {
            role: Role::Owner,
            owner_id: Some(Uuid::new_v4()),
            ..f.manager.clone()
        };
        let err = f
            .service
            .add_document(
                created.contract.id,
                NewDocument {
                    doc_type: DocumentType::Contract,
                    name: "lease.pdf".into(),
                    url: "https://files/lease.pdf".into(),
                },
                &other_owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(f.service.list(ContractFilters::default(), &other_owner).await.unwrap().is_empty());

        let tenant = AuthUser {
            role: Role::Tenant,
            tenant_id: Some(f.tenant.id),
            ..f.manager.clone()
        };
        let err = f.service.delete(created.contract.id, &tenant).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn duplicate_requires_free_listing_and_copies_terms() {
        let f = fixture().await;
        let created = f
            .service
            .create(input(&f, Some(f.tenant.id), ContractStatus::Active, 120), &f.manager)
            .await
            .unwrap();
        let id = created.contract.id;

        assert!(matches!(
            f.service.duplicate(id, &f.manager).await,
            Err(ServiceError::Validation(_))
        ));

        f.service.terminate(id, None, &f.manager).await.unwrap();
        let copy = f.service.duplicate(id, &f.manager).await.unwrap();
        assert_eq!(copy.contract.status, ContractStatus::Draft);
        assert_eq!(copy.contract.tenant_id, None);
        assert_eq!(copy.contract.start_date, created.contract.end_date);
        assert_eq!(copy.contract.term_length(), created.contract.term_length());
        assert_eq!(copy.contract.weekly_rent, created.contract.weekly_rent);
    }

    #[tokio::test]
    async fn ended_contracts_cannot_be_reactivated_by_update() {
        let f = fixture().await;

        let bare = f
            .service
            .create(input(&f, None, ContractStatus::Draft, 120), &f.manager)
            .await
            .unwrap();
        f.service
            .transition(bare.contract.id, ContractStatus::Ended, &f.manager)
            .await
            .unwrap();
        let err = f
            .service
            .transition(bare.contract.id, ContractStatus::Active, &f.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let stored = f.store.get_contract(bare.contract.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Ended);

        let leased = f
            .service
            .create(input(&f, Some(f.tenant.id), ContractStatus::Active, 120), &f.manager)
            .await
            .unwrap();
        f.service
            .transition(leased.contract.id, ContractStatus::Ended, &f.manager)
            .await
            .unwrap();
        let err = f
            .service
            .transition(leased.contract.id, ContractStatus::Active, &f.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let listing = f.store.get_listing(f.listing.id).await.unwrap().unwrap();
        let tenant = f.store.get_tenant(f.tenant.id).await.unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Published);
        assert_eq!(listing.tenant_id, None);
        assert_eq!(tenant.current_contract_id, None);
        assert_eq!(tenant.status, TenantStatus::Ended);
    }

    #[tokio::test]
    async fn ending_soon_is_never_set_by_hand() {
        let f = fixture().await;
        let draft = f
            .service
            .create(input(&f, None, ContractStatus::Draft, 120), &f.manager)
            .await
            .unwrap();

        let err = f
            .service
            .transition(draft.contract.id, ContractStatus::EndingSoon, &f.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let stored = f.store.get_contract(draft.contract.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ContractStatus::Draft);

        let query = ContractQuery::default().with_statuses(&[ContractStatus::EndingSoon]);
        assert_eq!(f.store.count_contracts(&query).await.unwrap(), 0);
    }
}

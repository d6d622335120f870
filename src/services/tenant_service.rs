use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth_service::{deactivate_account, provision_account, AccountInfo, AccountLink};
use super::contract_service::{default_lease, ContractService, CreateContract};
use super::{is_valid_email, ListingSummary, OwnerSummary, Pagination, ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::config::ContractConfig;
use crate::database::models::{
    flexible_date, Contract, ContractStatus, ContractTerms, EmergencyContact, LeadStatus, PaymentFrequency, Role,
    Tenant, TenantDocuments, TenantStatus,
};
use crate::store::{ContractOrder, ContractQuery, RentalStore, TenantQuery};

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantFilters {
    pub status: Option<TenantStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Personal fields accepted on create
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub documents: TenantDocuments,
    pub notes: Option<String>,
    pub owner_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub converted_from_lead_id: Option<Uuid>,
}

/// Lease terms supplied when a contract is created together with a tenant.
/// Anything missing falls back to the default six month lease.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaseInput {
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option::deserialize")]
    pub end_date: Option<DateTime<Utc>>,
    pub weekly_rent: Option<Decimal>,
    pub bond_amount: Option<Decimal>,
    pub bond_paid: Option<bool>,
    pub payment_frequency: Option<PaymentFrequency>,
    pub notice_period_days: Option<i32>,
    pub bills_included: Option<bool>,
    pub terms: Option<ContractTerms>,
    pub status: Option<ContractStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenant {
    #[serde(flatten)]
    pub tenant: NewTenant,
    #[serde(default)]
    pub create_contract: bool,
    pub contract_data: Option<LeaseInput>,
    #[serde(default)]
    pub create_user_account: bool,
    pub user_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub documents: Option<TenantDocuments>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertLead {
    #[serde(flatten)]
    pub lease: LeaseInput,
    pub phone: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

/// Contract fields shown on a tenant
#[derive(Debug, Clone, Serialize)]
pub struct CurrentContract {
    pub id: Uuid,
    pub status: ContractStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub weekly_rent: Decimal,
    pub listing: Option<ListingSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantView {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub owner: Option<OwnerSummary>,
    pub current_contract: Option<CurrentContract>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TenantCreated {
    pub tenant: TenantView,
    pub user: Option<AccountInfo>,
    pub contract: Option<ContractOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndingSoonTenant {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub owner: Option<OwnerSummary>,
    pub contract_end_date: DateTime<Utc>,
    pub contract_id: Uuid,
    pub listing: Option<ListingSummary>,
}

pub struct TenantService {
    store: Arc<dyn RentalStore>,
    contracts: ContractService,
    settings: ContractConfig,
    hash_cost: u32,
}

impl TenantService {
    pub fn new(store: Arc<dyn RentalStore>, settings: ContractConfig, hash_cost: u32) -> Self {
        Self {
            contracts: ContractService::new(store.clone(), settings.clone()),
            store,
            settings,
            hash_cost,
        }
    }

    /// Newest first, scoped by role: owners see their tenants past and present,
    /// tenants see themselves.
    pub async fn list(&self, filters: TenantFilters, actor: &AuthUser) -> ServiceResult<(Vec<TenantView>, Pagination)> {
        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);

        let mut query = TenantQuery {
            status: filters.status,
            search: filters.search.filter(|s| !s.trim().is_empty()),
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
            Role::Tenant => {
                let tenant_id = actor
                    .tenant_id
                    .ok_or_else(|| ServiceError::validation("Tenant must have a tenant_id"))?;
                query.ids = Some(vec![tenant_id]);
            }
        }

        let total = self.store.count_tenants(&query).await?;
        let pagination = Pagination::new(page, limit, total);
        query.limit = Some(limit as i32);
        query.offset = Some(pagination.offset());

        let tenants = self.store.list_tenants(&query).await?;
        let mut views = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            views.push(self.view(tenant).await?);
        }
        Ok((views, pagination))
    }

    pub async fn get(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<TenantView> {
        let tenant = self.load(id).await?;
        ensure_can_read(&tenant, actor)?;
        self.view(tenant).await
    }

    pub async fn create(&self, input: CreateTenant, actor: &AuthUser) -> ServiceResult<TenantCreated> {
        if actor.is_tenant() {
            return Err(ServiceError::forbidden("Tenants cannot create tenants"));
        }
        let data = input.tenant;
        validate_person(&data.name, &data.email)?;

        let owner_id = match data.listing_id {
            Some(listing_id) => {
                let listing = self
                    .store
                    .get_listing(listing_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Listing not found"))?;
                Some(listing.owner_id)
            }
            None if actor.is_owner() => actor.owner_id,
            None => data.owner_id,
        }
        .ok_or_else(|| ServiceError::validation("owner_id is required when no listing is provided"))?;

        let mut tenant = Tenant::new(data.name.trim().to_string(), data.email, owner_id);
        tenant.phone = data.phone;
        tenant.emergency_contact = data.emergency_contact;
        tenant.documents = data.documents;
        tenant.notes = data.notes;
        tenant.converted_from_lead_id = data.converted_from_lead_id;
        let tenant = self.store.insert_tenant(tenant).await?;
        info!(tenant_id = %tenant.id, owner_id = %owner_id, "tenant created");

        if let Some(lead_id) = tenant.converted_from_lead_id {
            self.mark_lead_converted(lead_id).await?;
        }

        let contract = match data.listing_id {
            Some(listing_id) if input.create_contract => {
                let lease = input.contract_data.unwrap_or_default();
                let request = self.contract_request(listing_id, tenant.id, lease);
                Some(match self.contracts.create(request, actor).await {
                    Ok(view) => ContractOutcome {
                        contract_id: Some(view.contract.id),
                        error: None,
                        message: "Contract created successfully".to_string(),
                    },
                    Err(err) => {
                        warn!(tenant_id = %tenant.id, error = %err, "contract creation for new tenant failed");
                        ContractOutcome {
                            contract_id: None,
                            error: Some("Contract creation failed".to_string()),
                            message: err.to_string(),
                        }
                    }
                })
            }
            _ => None,
        };

        let user = if input.create_user_account {
            Some(
                provision_account(
                    self.store.as_ref(),
                    AccountLink::Tenant(tenant.id),
                    &tenant.email,
                    &tenant.name,
                    tenant.phone.clone(),
                    input.user_password,
                    self.hash_cost,
                )
                .await,
            )
        } else {
            None
        };

        // Re-read: a linked contract has updated the back-reference
        let tenant = self.load(tenant.id).await?;
        Ok(TenantCreated {
            tenant: self.view(tenant).await?,
            user,
            contract,
        })
    }

    /// Personal fields only. Status and the contract back-reference follow the
    /// contract lifecycle.
    pub async fn update(&self, id: Uuid, patch: UpdateTenant, actor: &AuthUser) -> ServiceResult<TenantView> {
        let mut tenant = self.load(id).await?;
        ensure_can_write(&tenant, actor, true)?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("Name cannot be empty"));
            }
            tenant.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            if !is_valid_email(&email) {
                return Err(ServiceError::validation("Invalid email address"));
            }
            tenant.email = email.trim().to_lowercase();
        }
        if let Some(phone) = patch.phone {
            tenant.phone = Some(phone);
        }
        if let Some(contact) = patch.emergency_contact {
            tenant.emergency_contact = contact;
        }
        if let Some(documents) = patch.documents {
            tenant.documents = documents;
        }
        if let Some(notes) = patch.notes {
            tenant.notes = Some(notes);
        }
        tenant.updated_at = Utc::now();

        let tenant = self.store.update_tenant(tenant).await?;
        self.view(tenant).await
    }

    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<()> {
        let tenant = self.load(id).await?;
        ensure_can_write(&tenant, actor, false)?;

        if self.contracts.active_for_tenant(id).await?.is_some() {
            return Err(ServiceError::validation(
                "Cannot delete tenant with active contract. Terminate the contract first.",
            ));
        }

        if let Err(err) = deactivate_account(self.store.as_ref(), AccountLink::Tenant(id)).await {
            warn!(tenant_id = %id, error = %err, "failed to deactivate tenant user account");
        }
        self.store.delete_tenant(id).await?;
        info!(tenant_id = %id, email = %tenant.email, "tenant deleted");
        Ok(())
    }

    /// Creates a tenant with an active lease on the listing the lead enquired about.
    pub async fn convert_from_lead(&self, lead_id: Uuid, input: ConvertLead, actor: &AuthUser) -> ServiceResult<TenantView> {
        if actor.is_tenant() {
            return Err(ServiceError::forbidden("Tenants cannot convert leads"));
        }
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Lead not found"))?;
        let listing_id = lead
            .listing_id
            .ok_or_else(|| ServiceError::validation("Lead must be associated with a listing"))?;
        let listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Listing not found"))?;
        if actor.is_owner() && actor.owner_id != Some(listing.owner_id) {
            return Err(ServiceError::forbidden("Not authorized to convert leads for this property"));
        }

        let mut tenant = Tenant::new(lead.name.clone(), lead.email.clone(), listing.owner_id);
        tenant.phone = input.phone.or(lead.phone.clone());
        tenant.emergency_contact = input.emergency_contact.unwrap_or_default();
        tenant.notes = input.notes.or(lead.message.clone()).or_else(|| Some(String::new()));
        tenant.converted_from_lead_id = Some(lead.id);
        let tenant = self.store.insert_tenant(tenant).await?;

        let mut lease = input.lease;
        lease.status = Some(ContractStatus::Active);
        if lease.bills_included.is_none() {
            lease.bills_included = Some(false);
        }
        let request = self.contract_request(listing.id, tenant.id, lease);
        if let Err(err) = self.contracts.create(request, actor).await {
            // The lease could not be opened; do not leave an orphan tenant behind.
            self.store.delete_tenant(tenant.id).await?;
            return Err(err);
        }

        self.mark_lead_converted(lead.id).await?;
        info!(lead_id = %lead.id, tenant_id = %tenant.id, listing_id = %listing.id, "lead converted to tenant");

        let tenant = self.load(tenant.id).await?;
        self.view(tenant).await
    }

    /// Tenants whose active-like lease ends within the ending-soon window,
    /// soonest first.
    pub async fn ending_soon(&self, actor: &AuthUser) -> ServiceResult<Vec<EndingSoonTenant>> {
        let now = Utc::now();
        let mut query = ContractQuery {
            end_from: Some(now),
            end_to: Some(now + Duration::days(self.settings.ending_soon_days)),
            order: ContractOrder::EndingFirst,
            ..ContractQuery::default().with_statuses(&ContractStatus::ACTIVE_LIKE)
        };
        match actor.role {
            Role::Manager => {}
            Role::Owner => query.owner_id = Some(actor.owner_id.unwrap_or_else(Uuid::nil)),
            Role::Tenant => query.tenant_id = Some(actor.tenant_id.unwrap_or_else(Uuid::nil)),
        }

        let contracts = self.store.list_contracts(&query).await?;
        let mut result = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let Some(tenant_id) = contract.tenant_id else {
                continue;
            };
            let Some(tenant) = self.store.get_tenant(tenant_id).await? else {
                continue;
            };
            let owner = self.store.get_owner(tenant.owner_id).await?;
            let listing = self.store.get_listing(contract.listing_id).await?;
            result.push(EndingSoonTenant {
                tenant,
                owner: owner.as_ref().map(OwnerSummary::from),
                contract_end_date: contract.end_date,
                contract_id: contract.id,
                listing: listing.as_ref().map(ListingSummary::from),
            });
        }
        Ok(result)
    }

    /// Terminates the tenant's current lease and detaches the tenant.
    pub async fn unlink(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<TenantView> {
        let tenant = self.load(id).await?;
        ensure_can_write(&tenant, actor, false)?;

        if let Some(contract) = self.contracts.active_for_tenant(id).await? {
            self.contracts
                .terminate(contract.id, Some("Unlinked by user".to_string()), actor)
                .await?;
        }

        // The coordinator only releases a tenant pointing at the closed lease
        let mut tenant = self.load(id).await?;
        if tenant.current_contract_id.is_some() || tenant.status != TenantStatus::Ended {
            tenant.release();
            tenant = self.store.update_tenant(tenant).await?;
        }
        info!(tenant_id = %id, "tenant unlinked");
        self.view(tenant).await
    }

    pub async fn view(&self, tenant: Tenant) -> ServiceResult<TenantView> {
        let owner = self.store.get_owner(tenant.owner_id).await?;
        let current_contract = match tenant.current_contract_id {
            Some(id) => match self.store.get_contract(id).await? {
                Some(contract) => Some(self.current_contract(contract).await?),
                None => None,
            },
            None => None,
        };
        Ok(TenantView {
            owner: owner.as_ref().map(OwnerSummary::from),
            current_contract,
            tenant,
        })
    }

    async fn current_contract(&self, contract: Contract) -> ServiceResult<CurrentContract> {
        let listing = self.store.get_listing(contract.listing_id).await?;
        Ok(CurrentContract {
            id: contract.id,
            status: contract.status,
            start_date: contract.start_date,
            end_date: contract.end_date,
            weekly_rent: contract.weekly_rent,
            listing: listing.as_ref().map(ListingSummary::from),
        })
    }

    fn contract_request(&self, listing_id: Uuid, tenant_id: Uuid, lease: LeaseInput) -> CreateContract {
        let (default_start, default_end) = default_lease(&self.settings, Utc::now());
        CreateContract {
            listing_id,
            tenant_id: Some(tenant_id),
            start_date: lease.start_date.unwrap_or(default_start),
            end_date: lease.end_date.unwrap_or(default_end),
            signed_date: None,
            weekly_rent: lease.weekly_rent.unwrap_or(Decimal::ZERO),
            bond_amount: lease.bond_amount.unwrap_or(Decimal::ZERO),
            bond_paid: lease.bond_paid.unwrap_or(false),
            payment_frequency: lease.payment_frequency,
            notice_period_days: lease.notice_period_days,
            bills_included: lease.bills_included,
            terms: lease.terms.unwrap_or_default(),
            status: Some(lease.status.unwrap_or(ContractStatus::Active)),
        }
    }

    async fn mark_lead_converted(&self, lead_id: Uuid) -> ServiceResult<()> {
        if let Some(mut lead) = self.store.get_lead(lead_id).await? {
            lead.status = LeadStatus::Converted;
            lead.updated_at = Utc::now();
            self.store.update_lead(lead).await?;
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Tenant> {
        self.store
            .get_tenant(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant not found"))
    }
}

fn validate_person(name: &str, email: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation("Name is required"));
    }
    if !is_valid_email(email) {
        return Err(ServiceError::validation("Invalid email address"));
    }
    Ok(())
}

fn ensure_can_read(tenant: &Tenant, actor: &AuthUser) -> ServiceResult<()> {
    let allowed = match actor.role {
        Role::Manager => true,
        Role::Owner => actor.owner_id == Some(tenant.owner_id),
        Role::Tenant => actor.tenant_id == Some(tenant.id),
    };
    if !allowed {
        return Err(ServiceError::forbidden("Not authorized to view this tenant"));
    }
    Ok(())
}

fn ensure_can_write(tenant: &Tenant, actor: &AuthUser, allow_self: bool) -> ServiceResult<()> {
    let allowed = match actor.role {
        Role::Manager => true,
        Role::Owner => actor.owner_id == Some(tenant.owner_id),
        Role::Tenant => allow_self && actor.tenant_id == Some(tenant.id),
    };
    if !allowed {
        return Err(ServiceError::forbidden("Not authorized to modify this tenant"));
    }
    Ok(())
}

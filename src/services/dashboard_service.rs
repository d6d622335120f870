use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::models::{
    ContractStatus, Lead, LeadStatus, Listing, ListingStatus, OwnerStatus, PaymentFrequency, Role, Tenant,
    TenantStatus,
};
use crate::store::{ContractQuery, LeadQuery, ListingQuery, OwnerQuery, RentalStore, TenantQuery};

const RECENT: i32 = 5;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Counts {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LeadCounts {
    pub total: i64,
    pub new: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TenantCounts {
    pub total: i64,
    pub active: i64,
    pub ending_soon: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub listings: Counts,
    pub leads: LeadCounts,
    pub owners: Counts,
    pub tenants: TenantCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerDashboard {
    pub stats: ManagerStats,
    #[serde(rename = "recentLeads")]
    pub recent_leads: Vec<Lead>,
    #[serde(rename = "recentListings")]
    pub recent_listings: Vec<Listing>,
    #[serde(rename = "recentTenants")]
    pub recent_tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Income {
    pub monthly: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerStats {
    /// `active` counts listings under an active-like lease
    pub listings: Counts,
    /// Contract-based: `total` counts every contract on the owner's listings
    pub tenants: TenantCounts,
    pub income: Income,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDashboard {
    pub stats: OwnerStats,
    #[serde(rename = "recentListings")]
    pub recent_listings: Vec<Listing>,
    #[serde(rename = "recentTenants")]
    pub recent_tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaseSummary {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_rent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_frequency: Option<PaymentFrequency>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySummary {
    pub title: String,
    pub address: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextPayment {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    #[serde(rename = "daysUntil")]
    pub days_until: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantStats {
    pub tenant: LeaseSummary,
    pub property: Option<PropertySummary>,
    #[serde(rename = "nextPayment")]
    pub next_payment: Option<NextPayment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDashboard {
    pub stats: TenantStats,
    #[serde(rename = "tenantData")]
    pub tenant_data: Tenant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Dashboard {
    Manager(ManagerDashboard),
    Owner(OwnerDashboard),
    Tenant(TenantDashboard),
}

pub struct DashboardService {
    store: Arc<dyn RentalStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self, actor: &AuthUser) -> ServiceResult<Dashboard> {
        match actor.role {
            Role::Manager => Ok(Dashboard::Manager(self.manager().await?)),
            Role::Owner => {
                let owner_id = actor
                    .owner_id
                    .ok_or_else(|| ServiceError::validation("Owner must have an owner_id"))?;
                Ok(Dashboard::Owner(self.owner(owner_id).await?))
            }
            Role::Tenant => {
                let tenant_id = actor
                    .tenant_id
                    .ok_or_else(|| ServiceError::validation("Tenant must have a tenant_id"))?;
                Ok(Dashboard::Tenant(self.tenant(tenant_id, Utc::now()).await?))
            }
        }
    }

    async fn manager(&self) -> ServiceResult<ManagerDashboard> {
        let s = self.store.as_ref();
        let all_listings = ListingQuery::default();
        let published = ListingQuery {
            statuses: vec![ListingStatus::Published],
            ..Default::default()
        };
        let all_leads = LeadQuery::default();
        let new_leads = LeadQuery {
            status: Some(LeadStatus::New),
            ..Default::default()
        };
        let all_owners = OwnerQuery::default();
        let active_owners = OwnerQuery {
            status: Some(OwnerStatus::Active),
            ..Default::default()
        };
        let all_tenants = TenantQuery::default();
        let tenant_status = |status| TenantQuery {
            status: Some(status),
            ..Default::default()
        };
        let active_tenants = tenant_status(TenantStatus::Active);
        let ending_tenants = tenant_status(TenantStatus::EndingSoon);

        let (listings, active, leads, new, owners, active_owner_count) = futures::try_join!(
            s.count_listings(&all_listings),
            s.count_listings(&published),
            s.count_leads(&all_leads),
            s.count_leads(&new_leads),
            s.count_owners(&all_owners),
            s.count_owners(&active_owners),
        )?;
        let (tenants, active_tenant_count, ending_soon) = futures::try_join!(
            s.count_tenants(&all_tenants),
            s.count_tenants(&active_tenants),
            s.count_tenants(&ending_tenants),
        )?;

        let stats = ManagerStats {
            listings: Counts { total: listings, active },
            leads: LeadCounts { total: leads, new },
            owners: Counts {
                total: owners,
                active: active_owner_count,
            },
            tenants: TenantCounts {
                total: tenants,
                active: active_tenant_count,
                ending_soon,
            },
        };

        Ok(ManagerDashboard {
            stats,
            recent_leads: s
                .list_leads(&LeadQuery {
                    limit: Some(RECENT),
                    ..Default::default()
                })
                .await?,
            recent_listings: s
                .list_listings(&ListingQuery {
                    limit: Some(RECENT),
                    ..Default::default()
                })
                .await?,
            recent_tenants: s
                .list_tenants(&TenantQuery {
                    limit: Some(RECENT),
                    ..Default::default()
                })
                .await?,
        })
    }

    async fn owner(&self, owner_id: Uuid) -> ServiceResult<OwnerDashboard> {
        let s = self.store.as_ref();
        let owned = ListingQuery {
            owner_id: Some(owner_id),
            ..Default::default()
        };
        let contracts = ContractQuery::for_owner(owner_id);

        let active_like = s
            .count_contracts(&contracts.clone().with_statuses(&ContractStatus::ACTIVE_LIKE))
            .await?;
        let ending_soon = s
            .count_contracts(&contracts.clone().with_statuses(&[ContractStatus::EndingSoon]))
            .await?;
        let active = s
            .list_contracts(&contracts.clone().with_statuses(&[ContractStatus::Active]))
            .await?;
        let monthly = active
            .iter()
            .map(|c| c.weekly_rent * Decimal::from(4))
            .sum::<Decimal>();

        let stats = OwnerStats {
            listings: Counts {
                total: s.count_listings(&owned).await?,
                active: active_like,
            },
            tenants: TenantCounts {
                total: s.count_contracts(&contracts).await?,
                active: active_like,
                ending_soon,
            },
            income: Income { monthly },
        };

        Ok(OwnerDashboard {
            stats,
            recent_listings: s
                .list_listings(&ListingQuery {
                    limit: Some(RECENT),
                    ..owned
                })
                .await?,
            recent_tenants: s
                .list_tenants(&TenantQuery {
                    owner_id: Some(owner_id),
                    limit: Some(RECENT),
                    ..Default::default()
                })
                .await?,
        })
    }

    async fn tenant(&self, tenant_id: Uuid, now: DateTime<Utc>) -> ServiceResult<TenantDashboard> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tenant data not found"))?;

        let contract = match tenant.current_contract_id {
            Some(id) => self.store.get_contract(id).await?,
            None => None,
        };
        let Some(contract) = contract else {
            return Ok(TenantDashboard {
                stats: TenantStats {
                    tenant: LeaseSummary {
                        status: "available".to_string(),
                        weekly_rent: None,
                        bond_paid: None,
                        bond_amount: None,
                        lease_start: None,
                        lease_end: None,
                        days_remaining: None,
                        payment_frequency: None,
                    },
                    property: None,
                    next_payment: None,
                },
                tenant_data: tenant,
            });
        };

        let listing = self.store.get_listing(contract.listing_id).await?;
        let days_until = contract.days_until_next_payment_at(now);

        Ok(TenantDashboard {
            stats: TenantStats {
                tenant: LeaseSummary {
                    status: contract.status.to_string(),
                    weekly_rent: Some(contract.weekly_rent),
                    bond_paid: Some(contract.bond_paid),
                    bond_amount: Some(contract.bond_amount),
                    lease_start: Some(contract.start_date),
                    lease_end: Some(contract.end_date),
                    days_remaining: Some(contract.days_remaining_at(now)),
                    payment_frequency: Some(contract.payment_frequency),
                },
                property: listing.map(|l| PropertySummary {
                    title: l.title,
                    address: l.address,
                    images: l.images,
                }),
                next_payment: Some(NextPayment {
                    date: now + Duration::days(days_until),
                    amount: contract.weekly_rent,
                    days_until,
                }),
            },
            tenant_data: tenant,
        })
    }
}

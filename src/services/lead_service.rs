use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{is_valid_email, ServiceError, ServiceResult};
use crate::auth::AuthUser;
use crate::database::models::{Lead, LeadStatus};
use crate::store::{LeadQuery, RentalStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilters {
    pub status: Option<LeadStatus>,
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLead {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub listing_id: Option<Uuid>,
    pub status: Option<LeadStatus>,
}

/// Listing fields shown on a lead
#[derive(Debug, Clone, Serialize)]
pub struct LeadListing {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    #[serde(flatten)]
    pub lead: Lead,
    pub listing: Option<LeadListing>,
}

pub struct LeadService {
    store: Arc<dyn RentalStore>,
}

impl LeadService {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filters: LeadFilters, actor: &AuthUser) -> ServiceResult<Vec<LeadView>> {
        ensure_staff(actor)?;
        let query = LeadQuery {
            status: filters.status,
            listing_id: filters.listing_id,
            ..Default::default()
        };
        let leads = self.store.list_leads(&query).await?;
        let mut views = Vec::with_capacity(leads.len());
        for lead in leads {
            views.push(self.view(lead).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<LeadView> {
        ensure_staff(actor)?;
        let lead = self.load(id).await?;
        self.view(lead).await
    }

    /// Public enquiry form
    pub async fn create(&self, input: CreateLead) -> ServiceResult<Lead> {
        validate(&input.name, &input.email)?;
        if let Some(listing_id) = input.listing_id {
            if self.store.get_listing(listing_id).await?.is_none() {
                return Err(ServiceError::not_found("Listing not found"));
            }
        }

        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            message: input.message,
            listing_id: input.listing_id,
            status: LeadStatus::New,
            created_at: now,
            updated_at: now,
        };
        let lead = self.store.insert_lead(lead).await?;
        info!(lead_id = %lead.id, listing_id = ?lead.listing_id, "lead received");
        Ok(lead)
    }

    pub async fn update(&self, id: Uuid, patch: UpdateLead, actor: &AuthUser) -> ServiceResult<Lead> {
        ensure_staff(actor)?;
        let mut lead = self.load(id).await?;

        if let Some(name) = patch.name {
            if name.trim().chars().count() < 2 {
                return Err(ServiceError::validation("name must be at least 2 characters"));
            }
            lead.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            if !is_valid_email(&email) {
                return Err(ServiceError::validation("Invalid email address"));
            }
            lead.email = email.trim().to_lowercase();
        }
        if let Some(phone) = patch.phone {
            lead.phone = Some(phone);
        }
        if let Some(message) = patch.message {
            lead.message = Some(message);
        }
        if let Some(listing_id) = patch.listing_id {
            lead.listing_id = Some(listing_id);
        }
        if let Some(status) = patch.status {
            lead.status = status;
        }
        lead.updated_at = Utc::now();

        Ok(self.store.update_lead(lead).await?)
    }

    pub async fn set_status(&self, id: Uuid, status: LeadStatus, actor: &AuthUser) -> ServiceResult<Lead> {
        ensure_staff(actor)?;
        let mut lead = self.load(id).await?;
        lead.status = status;
        lead.updated_at = Utc::now();
        let lead = self.store.update_lead(lead).await?;
        info!(lead_id = %id, status = %status, "lead status changed");
        Ok(lead)
    }

    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> ServiceResult<()> {
        ensure_staff(actor)?;
        self.load(id).await?;
        self.store.delete_lead(id).await?;
        info!(lead_id = %id, "lead deleted");
        Ok(())
    }

    async fn view(&self, lead: Lead) -> ServiceResult<LeadView> {
        let listing = match lead.listing_id {
            Some(id) => self.store.get_listing(id).await?.map(|l| LeadListing {
                id: l.id,
                title: l.title,
                slug: l.slug,
            }),
            None => None,
        };
        Ok(LeadView { lead, listing })
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Lead> {
        self.store
            .get_lead(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Lead not found"))
    }
}

fn ensure_staff(actor: &AuthUser) -> ServiceResult<()> {
    if actor.is_tenant() {
        return Err(ServiceError::forbidden("Tenants cannot access leads"));
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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;


string_enum! {
    /// Mirrors the linked contract; `available` until a lease is ever linked.
    TenantStatus {
        Active => "active",
        EndingSoon => "ending_soon",
        Ended => "ended",
        Available => "available",
    }
}

impl Default for TenantStatus {
    fn default() -> Self {
        TenantStatus::Available
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantDocuments {
    pub id_document: Option<String>,
    pub proof_of_income: Option<String>,
    pub references: Vec<String>,
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub emergency_contact: EmergencyContact,
    pub owner_id: Uuid,
    pub current_contract_id: Option<Uuid>,
    pub status: TenantStatus,
    pub documents: TenantDocuments,
    pub notes: Option<String>,
    pub converted_from_lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, email: String, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.trim().to_lowercase(),
            phone: None,
            emergency_contact: EmergencyContact::default(),
            owner_id,
            current_contract_id: None,
            status: TenantStatus::Available,
            documents: TenantDocuments::default(),
            notes: None,
            converted_from_lead_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Detaches the tenant from its lease.
    pub fn release(&mut self) {
        self.current_contract_id = None;
        self.status = TenantStatus::Ended;
        self.updated_at = Utc::now();
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;


string_enum! {
    LeadStatus {
        New => "new",
        Contacted => "contacted",
        Converted => "converted",
        Discarded => "discarded",
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub listing_id: Option<Uuid>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

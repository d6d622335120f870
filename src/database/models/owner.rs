use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;


string_enum! {
    OwnerStatus {
        Active => "active",
        Inactive => "inactive",
        Pending => "pending",
    }
}

impl Default for OwnerStatus {
    fn default() -> Self {
        OwnerStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: OwnerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;


string_enum! {
    Role {
        Manager => "manager",
        Owner => "owner",
        Tenant => "tenant",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password_hash: String, name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            password_hash,
            name,
            role,
            is_active: true,
            last_login: None,
            owner_id: None,
            tenant_id: None,
            avatar: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }
}

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::database::models::{Listing, Owner, Tenant, TransitionError};
use crate::store::StoreError;

pub mod auth_service;
pub mod contract_service;
pub mod dashboard_service;
pub mod lead_service;
pub mod listing_service;
pub mod owner_service;
pub mod storage_service;
pub mod tenant_service;

pub use auth_service::AuthService;
pub use contract_service::{ContractService, ContractView};
pub use dashboard_service::DashboardService;
pub use lead_service::LeadService;
pub use listing_service::ListingService;
pub use owner_service::OwnerService;
pub use storage_service::{StorageError, StorageService};
pub use tenant_service::TenantService;

/// Business-rule failures raised by the service layer. Each variant maps to one
/// HTTP status in `ApiError`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized(message.into())
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Tenant fields embedded in contract and listing views
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&Tenant> for TenantSummary {
    fn from(t: &Tenant) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            email: t.email.clone(),
            phone: t.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub title: String,
    pub address: String,
    pub images: Vec<String>,
}

impl From<&Listing> for ListingSummary {
    fn from(l: &Listing) -> Self {
        Self {
            id: l.id,
            title: l.title.clone(),
            address: l.address.clone(),
            images: l.images.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&Owner> for OwnerSummary {
    fn from(o: &Owner) -> Self {
        Self {
            id: o.id,
            name: o.name.clone(),
            email: o.email.clone(),
            phone: o.phone.clone(),
        }
    }
}

/// `{page, limit, total, pages}` for paged list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let pages = if limit == 0 { 0 } else { (total + limit as i64 - 1) / limit as i64 };
        Self { page, limit, total, pages }
    }

    pub fn offset(&self) -> i32 {
        (self.page.saturating_sub(1) * self.limit) as i32
    }
}

/// Light email shape check shared by the owner, lead and auth inputs
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_pages_up() {
        let p = Pagination::new(2, 20, 41);
        assert_eq!(p.pages, 3);
        assert_eq!(p.offset(), 20);
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@localhost"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("@example.com"));
    }
}

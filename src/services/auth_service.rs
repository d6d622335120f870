use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{is_valid_email, ServiceError, ServiceResult};
use crate::auth::{generate_jwt, hash_password, verify_password, AuthUser, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{Role, User};
use crate::store::{RentalStore, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Outcome of provisioning a login for an owner or tenant record. Reported back
/// to the caller alongside the created record; a failure here never fails the
/// record itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub password_reset_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl AccountInfo {
    fn failed(err: &ServiceError) -> Self {
        Self {
            error: Some("User account creation failed".to_string()),
            message: err.to_string(),
            ..Default::default()
        }
    }
}

/// The record a provisioned account is attached to
#[derive(Debug, Clone, Copy)]
pub enum AccountLink {
    Owner(Uuid),
    Tenant(Uuid),
}

pub struct AuthService {
    store: Arc<dyn RentalStore>,
    security: SecurityConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn RentalStore>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    pub async fn login(&self, req: LoginRequest) -> ServiceResult<LoginResponse> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(ServiceError::validation("Email and password are required"));
        }

        let user = match self.store.find_user_by_email(&req.email).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!(email = %req.email, "login rejected: unknown or inactive user");
                return Err(ServiceError::unauthorized("Invalid credentials"));
            }
        };
        if !verify_password(&req.password, &user.password_hash) {
            warn!(email = %user.email, "login rejected: bad password");
            return Err(ServiceError::unauthorized("Invalid credentials"));
        }

        let mut user = user;
        user.last_login = Some(Utc::now());
        user.updated_at = Utc::now();
        let user = self.store.update_user(user).await?;

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(LoginResponse { user, token })
    }

    pub fn issue_token(&self, user: &User) -> ServiceResult<String> {
        let claims = Claims::for_user(user, self.security.jwt_expiry_hours);
        Ok(generate_jwt(&claims, &self.security.jwt_secret)?)
    }

    pub async fn me(&self, actor: &AuthUser) -> ServiceResult<User> {
        self.store
            .get_user(actor.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub async fn change_password(&self, req: ChangePasswordRequest, actor: &AuthUser) -> ServiceResult<()> {
        if req.current_password.is_empty() || req.new_password.is_empty() {
            return Err(ServiceError::validation("Current password and new password are required"));
        }
        if req.new_password.chars().count() < self.security.min_password_length {
            return Err(ServiceError::Validation(format!(
                "New password must be at least {} characters",
                self.security.min_password_length
            )));
        }

        let mut user = self.me(actor).await?;
        if !verify_password(&req.current_password, &user.password_hash) {
            return Err(ServiceError::unauthorized("Current password is incorrect"));
        }

        user.password_hash = hash_password(&req.new_password, self.security.password_hash_cost)?;
        user.updated_at = Utc::now();
        self.store.update_user(user).await?;
        info!(user_id = %actor.user_id, "password changed");
        Ok(())
    }

    /// First manager account. Public, so it refuses to touch an existing email.
    pub async fn create_admin(&self, req: CreateAdminRequest) -> ServiceResult<User> {
        if req.email.trim().is_empty() || req.password.is_empty() || req.name.trim().is_empty() {
            return Err(ServiceError::validation("Email, password, and name are required"));
        }
        if !is_valid_email(&req.email) {
            return Err(ServiceError::validation("Invalid email address"));
        }
        if req.password.chars().count() < self.security.min_password_length {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        if self.store.find_user_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::validation("User already exists"));
        }

        let hash = hash_password(&req.password, self.security.password_hash_cost)?;
        let user = User::new(&req.email, hash, req.name.trim().to_string(), Role::Manager);
        let user = self.store.insert_user(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => ServiceError::validation("User already exists"),
            other => other.into(),
        })?;
        info!(user_id = %user.id, email = %user.email, "manager account created");
        Ok(user)
    }
}

/// Creates a login for an owner or tenant record, or links an existing user with
/// the same email. Never fails: problems are reported in the returned info.
pub(crate) async fn provision_account(
    store: &dyn RentalStore,
    link: AccountLink,
    email: &str,
    name: &str,
    phone: Option<String>,
    password: Option<String>,
    hash_cost: u32,
) -> AccountInfo {
    match try_provision(store, link, email, name, phone, password, hash_cost).await {
        Ok(info) => info,
        Err(err) => {
            warn!(email = %email, error = %err, "user account provisioning failed");
            AccountInfo::failed(&err)
        }
    }
}

async fn try_provision(
    store: &dyn RentalStore,
    link: AccountLink,
    email: &str,
    name: &str,
    phone: Option<String>,
    password: Option<String>,
    hash_cost: u32,
) -> ServiceResult<AccountInfo> {
    let role = match link {
        AccountLink::Owner(_) => Role::Owner,
        AccountLink::Tenant(_) => Role::Tenant,
    };

    if let Some(mut existing) = store.find_user_by_email(email).await? {
        // Owners keep a separate login; tenants take over the existing one.
        if let AccountLink::Owner(_) = link {
            return Ok(AccountInfo {
                message: "User account already exists with this email".to_string(),
                ..Default::default()
            });
        }
        attach(&mut existing, link);
        existing.role = role;
        existing.updated_at = Utc::now();
        let existing = store.update_user(existing).await?;
        info!(user_id = %existing.id, "existing user linked to tenant");
        return Ok(AccountInfo {
            email: Some(existing.email),
            role: Some(role),
            password_reset_required: true,
            message: "User account already existed and was linked".to_string(),
            ..Default::default()
        });
    }

    let password = password.filter(|p| !p.is_empty()).unwrap_or_else(temporary_password);
    let hash = hash_password(&password, hash_cost)?;
    let mut user = User::new(email, hash, name.to_string(), role);
    user.phone = phone;
    attach(&mut user, link);
    let user = store.insert_user(user).await?;
    info!(user_id = %user.id, role = %role, "user account created");

    Ok(AccountInfo {
        email: Some(user.email),
        temporary_password: Some(password),
        role: Some(role),
        message: "User account created successfully".to_string(),
        ..Default::default()
    })
}

fn attach(user: &mut User, link: AccountLink) {
    match link {
        AccountLink::Owner(id) => user.owner_id = Some(id),
        AccountLink::Tenant(id) => user.tenant_id = Some(id),
    }
}

/// Deactivates and detaches the login of a deleted owner or tenant, if one exists.
pub(crate) async fn deactivate_account(store: &dyn RentalStore, link: AccountLink) -> ServiceResult<()> {
    let user = match link {
        AccountLink::Owner(id) => store.find_user_by_owner(id).await?,
        AccountLink::Tenant(id) => store.find_user_by_tenant(id).await?,
    };
    let Some(mut user) = user else {
        return Ok(());
    };

    user.is_active = false;
    match link {
        AccountLink::Owner(_) => user.owner_id = None,
        AccountLink::Tenant(_) => user.tenant_id = None,
    }
    user.updated_at = Utc::now();
    let user = store.update_user(user).await?;
    info!(user_id = %user.id, "user account deactivated");
    Ok(())
}

/// Ten alphanumeric characters
fn temporary_password() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Claims for a login session. The role-specific id is only carried for
    /// the role it belongs to.
    pub fn for_user(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            owner_id: if user.role == Role::Owner { user.owner_id } else { None },
            tenant_id: if user.role == Role::Tenant { user.tenant_id } else { None },
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

pub fn hash_password(plain: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(plain, cost)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// The authenticated caller, extracted from the JWT by `jwt_auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub owner_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            owner_id: claims.owner_id,
            tenant_id: claims.tenant_id,
        }
    }
}

impl AuthUser {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn is_tenant(&self) -> bool {
        self.role == Role::Tenant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_user() -> User {
        let mut user = User::new("Owner@Example.com", "hash".into(), "Olive".into(), Role::Owner);
        user.owner_id = Some(Uuid::new_v4());
        user.tenant_id = Some(Uuid::new_v4());
        user
    }

    #[test]
    fn token_round_trip_keeps_role_scope() {
        let user = owner_user();
        let token = generate_jwt(&Claims::for_user(&user, 1), "secret").unwrap();
        let claims = validate_jwt(&token, "secret").unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.owner_id, user.owner_id);
        // a stray tenant_id on an owner account never reaches the token
        assert_eq!(claims.tenant_id, None);
    }

    #[test]
    fn rejects_wrong_secret_and_empty_secret() {
        let token = generate_jwt(&Claims::for_user(&owner_user(), 1), "secret").unwrap();
        assert!(matches!(validate_jwt(&token, "other"), Err(AuthError::InvalidToken(_))));
        assert!(matches!(generate_jwt(&Claims::for_user(&owner_user(), 1), ""), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use easylease_api::app::{build_router, AppState};
use easylease_api::auth::hash_password;
use easylease_api::config::AppConfig;
use easylease_api::database::models::{Role, User};
use easylease_api::store::{InMemoryStore, RentalStore};

/// The real router over a fresh in-memory store
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> Result<Uuid> {
        let raw = self.body["data"]["id"].as_str().context("response has no data.id")?;
        Ok(Uuid::parse_str(raw)?)
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let shared: Arc<dyn RentalStore> = store.clone();
        let router = build_router(AppState::new(shared, AppConfig::for_tests()));
        Self { router, store }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok(Response { status, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Inserts an account directly, bypassing the HTTP surface
    pub async fn seed_user(&self, email: &str, password: &str, role: Role) -> Result<User> {
        let hash = hash_password(password, 4)?;
        let user = User::new(email, hash, email.to_string(), role);
        Ok(self.store.insert_user(user).await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        Ok(res.data()["token"].as_str().context("no token")?.to_string())
    }

    pub async fn manager(&self) -> Result<String> {
        self.seed_user("manager@easylease.test", "manager-pass", Role::Manager).await?;
        self.login("manager@easylease.test", "manager-pass").await
    }

    /// Owner record plus its login, created through the API
    pub async fn owner(&self, manager: &str, email: &str) -> Result<(Uuid, String)> {
        let res = self
            .post(
                "/api/owners",
                manager,
                json!({
                    "name": "Olive Owner",
                    "email": email,
                    "create_user_account": true,
                    "user_password": "owner-pass"
                }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "owner create failed: {}", res.body);
        let id = res.id()?;
        let token = self.login(email, "owner-pass").await?;
        Ok((id, token))
    }

    pub async fn listing(&self, token: &str, title: &str, owner_id: Option<Uuid>) -> Result<Uuid> {
        let mut body = json!({
            "title": title,
            "address": "12 Smith Street",
            "suburb": "Fitzroy",
            "price_per_week": 250,
            "bond": 1000
        });
        if let Some(owner_id) = owner_id {
            body["owner_id"] = json!(owner_id);
        }
        let res = self.post("/api/listings", token, body).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "listing create failed: {}", res.body);
        res.id()
    }

    pub async fn tenant(&self, token: &str, name: &str, email: &str, listing_id: Uuid) -> Result<Uuid> {
        let res = self
            .post(
                "/api/tenants",
                token,
                json!({ "name": name, "email": email, "listing_id": listing_id }),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "tenant create failed: {}", res.body);
        res.id()
    }

    /// Contract body running from `start_offset` to `end_offset` days from now
    pub fn lease(listing_id: Uuid, tenant_id: Option<Uuid>, start_offset: i64, end_offset: i64) -> Value {
        let now = Utc::now();
        json!({
            "listing_id": listing_id,
            "tenant_id": tenant_id,
            "start_date": (now + Duration::days(start_offset)).to_rfc3339(),
            "end_date": (now + Duration::days(end_offset)).to_rfc3339(),
            "weekly_rent": 250,
            "bond_amount": 1000
        })
    }
}

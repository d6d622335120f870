// app.rs - shared state and route table for the HTTP server

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::services::{
    AuthService, ContractService, DashboardService, LeadService, ListingService, OwnerService, StorageService,
    TenantService,
};
use crate::store::RentalStore;

/// State shared by every handler. Services are cheap views over the store and
/// are built per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RentalStore>,
    pub config: Arc<AppConfig>,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(store: Arc<dyn RentalStore>, config: AppConfig) -> Self {
        let storage = StorageService::new(config.storage.clone());
        Self {
            store,
            config: Arc::new(config),
            storage,
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store.clone(), self.config.security.clone())
    }

    pub fn contracts(&self) -> ContractService {
        ContractService::new(self.store.clone(), self.config.contracts.clone())
    }

    pub fn tenants(&self) -> TenantService {
        TenantService::new(
            self.store.clone(),
            self.config.contracts.clone(),
            self.config.security.password_hash_cost,
        )
    }

    pub fn listings(&self) -> ListingService {
        ListingService::new(
            self.store.clone(),
            self.storage.clone(),
            self.config.storage.clone(),
            self.config.api.listings_default_limit,
            self.config.api.max_limit.unwrap_or(100),
        )
    }

    pub fn owners(&self) -> OwnerService {
        OwnerService::new(self.store.clone(), self.config.security.password_hash_cost)
    }

    pub fn leads(&self) -> LeadService {
        LeadService::new(self.store.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/api/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(public::auth::login))
        .route("/api/auth/admin/create", post(public::auth::create_admin))
        .route("/api/listings", get(public::listings::list))
        .route("/api/listings/slug/:slug", get(public::listings::by_slug))
        .route("/api/leads", post(public::leads::create))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    // Room for a full batch of images plus multipart framing
    let upload_limit = state.config.storage.max_image_bytes * state.config.storage.max_images_per_upload + 1024 * 1024;

    Router::new()
        // Session
        .route("/api/auth/me", get(protected::auth::me))
        .route("/api/auth/change-password", post(protected::auth::change_password))
        // Contracts
        .route("/api/contracts", get(protected::contracts::list).post(protected::contracts::create))
        .route(
            "/api/contracts/:id",
            get(protected::contracts::get)
                .put(protected::contracts::update)
                .delete(protected::contracts::delete),
        )
        .route("/api/contracts/:id/assign-tenant", post(protected::contracts::assign_tenant))
        .route("/api/contracts/:id/terminate", post(protected::contracts::terminate))
        .route("/api/contracts/:id/restart", post(protected::contracts::restart))
        .route("/api/contracts/:id/duplicate", post(protected::contracts::duplicate))
        .route("/api/contracts/:id/documents", post(protected::contracts::add_document))
        .route(
            "/api/contracts/:id/documents/:document_id",
            delete(protected::contracts::remove_document),
        )
        // Tenants
        .route("/api/tenants", get(protected::tenants::list).post(protected::tenants::create))
        .route("/api/tenants/ending-soon", get(protected::tenants::ending_soon))
        .route(
            "/api/tenants/convert-from-lead/:lead_id",
            post(protected::tenants::convert_from_lead),
        )
        .route(
            "/api/tenants/:id",
            get(protected::tenants::get)
                .put(protected::tenants::update)
                .delete(protected::tenants::delete),
        )
        .route("/api/tenants/:id/unlink", post(protected::tenants::unlink))
        // Listings
        .route("/api/listings", post(protected::listings::create))
        .route("/api/listings/admin/all", get(protected::listings::list_all))
        .route("/api/listings/admin/:id", get(protected::listings::get))
        .route(
            "/api/listings/upload-images",
            post(protected::listings::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/listings/delete-image", delete(protected::listings::delete_image))
        .route(
            "/api/listings/:id",
            axum::routing::put(protected::listings::update).delete(protected::listings::delete),
        )
        // Owners
        .route("/api/owners", get(protected::owners::list).post(protected::owners::create))
        .route(
            "/api/owners/:id",
            get(protected::owners::get)
                .put(protected::owners::update)
                .delete(protected::owners::delete),
        )
        .route("/api/owners/:id/status", patch(protected::owners::set_status))
        // Leads
        .route("/api/leads", get(protected::leads::list))
        .route(
            "/api/leads/:id",
            get(protected::leads::get)
                .put(protected::leads::update)
                .delete(protected::leads::delete),
        )
        .route("/api/leads/:id/status", patch(protected::leads::set_status))
        // Dashboard
        .route("/api/dashboard/stats", get(protected::dashboard::stats))
        // JWT first, then the account check
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "EasyLease API",
            "version": version,
            "description": "Property rental backend: listings, owners, tenants, contracts and leads",
            "endpoints": {
                "health": "/api/health (public)",
                "auth": "/api/auth/login, /api/auth/admin/create (public); /api/auth/me, /api/auth/change-password",
                "listings": "/api/listings, /api/listings/slug/:slug (public); /api/listings/admin/* (protected)",
                "leads": "POST /api/leads (public); /api/leads[/:id] (protected)",
                "contracts": "/api/contracts[/:id] (protected)",
                "tenants": "/api/tenants[/:id] (protected)",
                "owners": "/api/owners[/:id] (protected)",
                "dashboard": "/api/dashboard/stats (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend_name();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed on {} store: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": backend,
                        "store_error": e.to_string()
                    }
                })),
            )
        }
    }
}

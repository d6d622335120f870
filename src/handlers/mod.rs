// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth + active account)
//
// Every handler takes `State<AppState>`, builds the service it needs and maps
// `ServiceError` into `ApiError` with `?`. Protected handlers receive the caller
// as `Extension<AuthUser>`, inserted by `jwt_auth_middleware`.
pub mod protected; // Tier 2: JWT authentication required
pub mod public; // Tier 1: No authentication required

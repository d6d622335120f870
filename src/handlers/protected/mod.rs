// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: JWT Authentication Required
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware → validate_user_middleware
//
// Role scoping (manager / owner / tenant) is enforced by the services; the
// handlers only forward the caller.

pub mod auth;
pub mod contracts;
pub mod dashboard;
pub mod leads;
pub mod listings;
pub mod owners;
pub mod tenants;

// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, the first-admin bootstrap, the published listing
// catalogue and the enquiry form.
//
// Security Level: None (completely public access)
// Route Prefix: /api (e.g., /api/auth/login, /api/listings)
// Middleware: None (no authentication or authorization)

pub mod auth;
pub mod leads;
pub mod listings;

pub mod auth;
pub mod response;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, require_manager, AuthUser};
pub use response::{ApiResponse, ApiResult, ApiSuccess, IntoApiResponse};
pub use validate_user::validate_user_middleware;

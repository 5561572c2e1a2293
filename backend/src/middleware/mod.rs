//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, require_admin, AuthUser, Claims, CurrentUser, ADMIN_PROFILE};

//! Request extractors.

pub mod user_auth;

pub use user_auth::{AuthContext, UserRole, USER_ID_HEADER, USER_ROLE_HEADER};

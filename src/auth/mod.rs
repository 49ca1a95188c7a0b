//! # Auth Module
//!
//! Token validation and account bootstrap:
//! - JWT validation of provider-issued bearer tokens
//! - Registration of the token's identity as a user account
//! - Role lookup used by the portal's role resolver
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::{AuthedIdentity, AuthedUser};
pub use models::User;
pub use routes::auth_routes;

//! # Users Module
//!
//! Admin-only account management: listing accounts, blocking and
//! unblocking, and promoting donors to volunteer or admin.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

pub use routes::users_routes;
pub use services::UsersService;

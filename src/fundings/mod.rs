//! # Fundings Module
//!
//! Donations through a hosted checkout page:
//! - opening a checkout session
//! - verifying the returned session with the provider
//! - recording one funding per session, however often the commit is repeated
//! - funding history with lifetime totals

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

pub use routes::fundings_routes;
pub use services::FundingsService;

//! # Requests Module
//!
//! Donation requests and their lifecycle:
//! - creation by active donors
//! - owner edits and deletes while pending
//! - status changes guarded by role and current state
//! - public pending lists and location/blood group search
//! - status statistics for volunteers and admins

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::requests_routes;
pub use services::RequestsService;

//! # Donation domain
//!
//! Pure policy shared by the API server and the portal core:
//! - roles and the authorization gate
//! - the donation request state machine
//! - funding record shapes and checkout validation
//! - pagination arithmetic
//!
//! Nothing in this crate performs I/O.

pub mod access;
pub mod blood;
pub mod funding;
pub mod pagination;
pub mod request;
pub mod role;

pub use access::{
    can_access, can_manage, check_user_action, route_decision, AccessDenied, AccountStatus,
    CallerState, ManagedAccount, RouteClass, RouteDecision, UserAction,
};
pub use blood::BloodGroup;
pub use funding::{
    CheckoutRedirect, CheckoutRequest, CheckoutSession, CheckoutValidationError, CommitReceipt,
    FundingPage, FundingRecord, SessionVerificationError,
};
pub use pagination::{clamp_page, page_window, total_pages, Page, PageSlot};
pub use request::{
    check_delete, check_edit, check_status_change, DonationRequest, RequestActor, RequestStatus,
    StatusCounts, TransitionError,
};
pub use role::Role;

// src/services/mod.rs
//
// Integrations with external services

pub mod checkout;

pub use checkout::{CheckoutOrder, CheckoutProvider, PaymentError, RetrievedSession, StripeCheckout};

// src/services/checkout.rs
//! Hosted checkout provider
//!
//! The server talks to the provider through [`CheckoutProvider`] so the
//! funding flow can be exercised against a fake in tests.

use async_trait::async_trait;
use donation_domain::{CheckoutRedirect, CheckoutRequest, CheckoutSession};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::common::{safe_email_log, ApiError};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Payment provider request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response from payment provider: {0}")]
    InvalidResponse(String),

    #[error("Checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("Amount is too large")]
    AmountOverflow,
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::AmountOverflow => ApiError::ValidationError(err.to_string()),
            _ => ApiError::PaymentProvider(err.to_string()),
        }
    }
}

/// Everything the provider needs to open a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutOrder {
    pub request: CheckoutRequest,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutOrder {
    /// Charge in the smallest currency unit, rounded to the nearest one.
    pub fn unit_amount(&self) -> Result<i64, PaymentError> {
        let minor = (self.request.amount * 100.0).round();
        if !minor.is_finite() || minor < 0.0 || minor >= i64::MAX as f64 {
            return Err(PaymentError::AmountOverflow);
        }
        Ok(minor as i64)
    }
}

/// A session as retrieved from the provider, plus the donor name that
/// was attached when it was created.
#[derive(Debug, Clone)]
pub struct RetrievedSession {
    pub session: CheckoutSession,
    pub donor_name: Option<String>,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, order: &CheckoutOrder) -> Result<CheckoutRedirect, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError>;
}

/// Stripe Checkout over its form-encoded REST API.
pub struct StripeCheckout {
    client: Client,
    secret_key: Option<String>,
    api_base: String,
}

#[derive(Deserialize)]
struct StripeCreatedSession {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize, Default)]
struct StripeCustomerDetails {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct StripeMetadata {
    donor_name: Option<String>,
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    payment_status: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
    payment_intent: Option<serde_json::Value>,
    #[serde(default)]
    metadata: Option<StripeMetadata>,
}

impl StripeSession {
    fn into_retrieved(self) -> RetrievedSession {
        let details = self.customer_details.unwrap_or_default();
        // Expanded sessions carry the intent as an object.
        let payment_intent = match self.payment_intent {
            Some(serde_json::Value::String(id)) => Some(id),
            Some(serde_json::Value::Object(map)) => map
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        };
        let donor_name = self
            .metadata
            .and_then(|m| m.donor_name)
            .or(details.name);

        RetrievedSession {
            session: CheckoutSession {
                id: Some(self.id),
                payment_status: self.payment_status,
                amount_total: self.amount_total,
                currency: self.currency,
                customer_email: self.customer_email.or(details.email),
                payment_intent,
            },
            donor_name,
        }
    }
}

impl StripeCheckout {
    pub fn new(client: Client, secret_key: Option<String>, api_base: String) -> Self {
        Self {
            client,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)
    }

    async fn read_failure(response: reqwest::Response) -> String {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        format!("HTTP {}: {}", status, error_text)
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    async fn create_session(&self, order: &CheckoutOrder) -> Result<CheckoutRedirect, PaymentError> {
        let secret = self.secret()?;
        let unit_amount = order.unit_amount()?;
        let url = format!("{}/v1/checkout/sessions", self.api_base);

        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("success_url", order.success_url.clone()),
            ("cancel_url", order.cancel_url.clone()),
            ("customer_email", order.request.email.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", order.currency.clone()),
            ("line_items[0][price_data][unit_amount]", unit_amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("Donation from {}", order.request.name),
            ),
            ("metadata[donor_name]", order.request.name.clone()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let failure = Self::read_failure(response).await;
            error!(error = %failure, "Checkout session creation failed");
            return Err(PaymentError::RequestFailed(failure));
        }

        let created = response
            .json::<StripeCreatedSession>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        let redirect = created
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| PaymentError::InvalidResponse("no checkout url".to_string()))?;

        info!(
            session_id = %created.id,
            email = %safe_email_log(&order.request.email),
            amount = unit_amount,
            "Checkout session created"
        );

        Ok(CheckoutRedirect {
            url: redirect,
            session_id: Some(created.id),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError> {
        let secret = self.secret()?;
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.api_base,
            urlencoding::encode(session_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PaymentError::SessionNotFound(session_id.to_string()));
        }
        if !response.status().is_success() {
            let failure = Self::read_failure(response).await;
            error!(session_id = %session_id, error = %failure, "Checkout session lookup failed");
            return Err(PaymentError::RequestFailed(failure));
        }

        let session = response
            .json::<StripeSession>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        debug!(session_id = %session_id, status = %session.payment_status, "Checkout session retrieved");
        Ok(session.into_retrieved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_amount_is_minor_units() {
        let order = CheckoutOrder {
            request: CheckoutRequest {
                name: "Anonymous".to_string(),
                email: "a@b.co".to_string(),
                amount: 25.0,
            },
            currency: "usd".to_string(),
            success_url: String::new(),
            cancel_url: String::new(),
        };
        assert_eq!(order.unit_amount().unwrap(), 2500);

        let fractional = CheckoutOrder {
            request: CheckoutRequest {
                amount: 2.5,
                ..order.request.clone()
            },
            ..order.clone()
        };
        assert_eq!(fractional.unit_amount().unwrap(), 250);

        let rounded = CheckoutOrder {
            request: CheckoutRequest {
                amount: 19.99,
                ..order.request.clone()
            },
            ..order.clone()
        };
        assert_eq!(rounded.unit_amount().unwrap(), 1999);

        let huge = CheckoutOrder {
            request: CheckoutRequest {
                amount: f64::MAX,
                ..order.request.clone()
            },
            ..order
        };
        assert!(matches!(huge.unit_amount(), Err(PaymentError::AmountOverflow)));
    }

    #[test]
    fn test_stripe_session_mapping() {
        let raw = serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "amount_total": 5000,
            "currency": "usd",
            "customer_email": null,
            "customer_details": {"email": "donor@example.com", "name": "Rahim"},
            "payment_intent": {"id": "pi_1", "object": "payment_intent"},
            "metadata": {"donor_name": "Rahim Uddin"}
        });
        let session: StripeSession = serde_json::from_value(raw).unwrap();
        let retrieved = session.into_retrieved();

        assert_eq!(retrieved.donor_name.as_deref(), Some("Rahim Uddin"));
        assert_eq!(
            retrieved.session.customer_email.as_deref(),
            Some("donor@example.com")
        );
        assert_eq!(retrieved.session.payment_intent.as_deref(), Some("pi_1"));
        assert!(retrieved.session.verify(Some("DONOR@example.com")).is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_refuses() {
        let provider = StripeCheckout::new(Client::new(), None, "http://localhost:1".to_string());
        let err = provider.retrieve_session("cs_1").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured));
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }
}

//! Two-phase funding flow
//!
//! 1. [`PaymentFlow::initiate`] validates the form locally and asks the API
//!    for a checkout URL. Nothing is stored on this side.
//! 2. After the provider redirects back, [`PaymentFlow::complete`] recovers
//!    the session id from the return URL, verifies the session and commits
//!    it. The commit is keyed by session id on the server, so reloading the
//!    success page is harmless.

use donation_domain::{
    CheckoutRedirect, CheckoutRequest, CheckoutSession, CommitReceipt, FundingRecord, Page,
};
use reqwest::Method;
use tracing::{info, warn};

use crate::error::PortalError;
use crate::http::ApiClient;
use crate::query::{normalize_page, LatestTickets, ListQuery};

const SESSION_PARAM: &str = "session_id";
const CANCEL_SEGMENT: &str = "payment-cancel";
const LIST_KEY: &str = "fundings";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Success { session_id: String },
    Cancelled,
    /// Neither a cancel page nor a usable `session_id`.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Recorded(CommitReceipt),
    /// The payer backed out at the provider. Not an error.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingHistory {
    pub page: Page<FundingRecord>,
    /// Sum of every matching record, across all pages.
    pub total_amount: i64,
}

/// Reads the provider's return URL.
///
/// Accepts absolute URLs as well as bare paths; only the path's last segment
/// and the `session_id` query parameter matter.
pub fn parse_return_url(url: &str) -> ReturnOutcome {
    let url = url.trim();
    let without_fragment = url.split('#').next().unwrap_or_default();
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    if path.trim_end_matches('/').ends_with(CANCEL_SEGMENT) {
        return ReturnOutcome::Cancelled;
    }

    let session_id = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SESSION_PARAM)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|decoded| decoded.trim().to_string())
        })
        .filter(|value| !value.is_empty() && !value.starts_with('{'));

    match session_id {
        Some(session_id) => ReturnOutcome::Success { session_id },
        None => ReturnOutcome::Invalid,
    }
}

pub struct PaymentFlow {
    api: ApiClient,
    tickets: LatestTickets,
}

impl PaymentFlow {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tickets: LatestTickets::default(),
        }
    }

    /// Returns the URL the browser should be sent to.
    ///
    /// `email` falls back to the signed-in identity. Bad input is refused
    /// before any call is made.
    pub async fn initiate(
        &self,
        name: Option<&str>,
        email: Option<&str>,
        raw_amount: Option<&str>,
    ) -> Result<CheckoutRedirect, PortalError> {
        let identity_email = self.api.session().identity().map(|identity| identity.email);
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .or(identity_email.as_deref());
        let request = CheckoutRequest::parse(name, email, raw_amount)?;

        let body = serde_json::to_value(&request).map_err(|e| PortalError::Decode(e.to_string()))?;
        let redirect: CheckoutRedirect = self
            .api
            .send_json(Method::POST, "/create-checkout-session", Some(body))
            .await?;
        if redirect.url.trim().is_empty() {
            warn!("Checkout session created without a redirect URL");
            return Err(PortalError::Server(
                "Payment provider did not return a checkout URL".to_string(),
            ));
        }

        info!(amount = request.amount, "Checkout session started");
        Ok(redirect)
    }

    /// Checks the provider's view of the session. A failure is terminal and
    /// carries the session id.
    pub async fn verify(&self, session_id: &str) -> Result<CheckoutSession, PortalError> {
        let path = format!("/checkout-session/{}", urlencoding::encode(session_id));
        let session: CheckoutSession = self
            .api
            .get(&path, Vec::new())
            .await
            .map_err(|e| e.with_session(session_id))?;

        let payer = self.api.session().identity().map(|identity| identity.email);
        session.verify(payer.as_deref()).map_err(|e| {
            warn!(session_id = %session_id, error = %e, "Checkout session failed verification");
            PortalError::PaymentVerification {
                message: e.to_string(),
                session_id: Some(session_id.to_string()),
            }
        })?;
        Ok(session)
    }

    /// Records the funding. Safe to call again for the same session.
    pub async fn commit(&self, session_id: &str) -> Result<CommitReceipt, PortalError> {
        let query = vec![(SESSION_PARAM.to_string(), session_id.to_string())];
        let body = self
            .api
            .call(Method::PATCH, "/payment-success", query, None)
            .await
            .map_err(|e| e.with_session(session_id))?;
        let receipt: CommitReceipt = crate::http::decode(body)?;
        if !receipt.success {
            warn!(session_id = %session_id, "Payment was not recorded");
            return Err(PortalError::Server(format!(
                "Payment could not be recorded (session {})",
                session_id
            )));
        }
        if receipt.created {
            info!(session_id = %session_id, "Funding recorded");
        }
        Ok(receipt)
    }

    /// Handles the provider's redirect back to the portal.
    pub async fn complete(&self, return_url: &str) -> Result<PaymentOutcome, PortalError> {
        let session_id = match parse_return_url(return_url) {
            ReturnOutcome::Success { session_id } => session_id,
            ReturnOutcome::Cancelled => return Ok(PaymentOutcome::Cancelled),
            ReturnOutcome::Invalid => {
                return Err(PortalError::PaymentVerification {
                    message: "Return link has no payment session".to_string(),
                    session_id: None,
                })
            }
        };

        self.verify(&session_id).await?;
        let receipt = self.commit(&session_id).await?;
        Ok(PaymentOutcome::Recorded(receipt))
    }

    pub async fn history(&self, query: &ListQuery) -> Result<FundingHistory, PortalError> {
        let ticket = self.tickets.issue(LIST_KEY);
        let body = self
            .api
            .call(Method::GET, "/fundings", query.params(), None)
            .await?;
        if !self.tickets.is_current(&ticket) {
            return Err(PortalError::Stale);
        }

        // A bare array carries no sum of its own.
        let reported_sum = body.get("total").and_then(|t| t.as_i64());
        let page: Page<FundingRecord> = normalize_page(body, "fundings", query.limit)?;
        let total_amount =
            reported_sum.unwrap_or_else(|| page.result.iter().map(|f| f.amount).sum());
        Ok(FundingHistory { page, total_amount })
    }
}

//! Funding records and the checkout contract

use serde::{Deserialize, Serialize};

/// A persisted receipt of a paid checkout session.
///
/// `session_id` is the idempotency key: at most one record exists per
/// session. `amount` is in the smallest currency unit, as charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRecord {
    pub id: String,
    pub session_id: String,
    pub donor_name: Option<String>,
    pub donor_email: String,
    pub amount: i64,
    pub currency: String,
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub paid_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutValidationError {
    #[error("User email missing")]
    MissingEmail,
    #[error("Amount is required")]
    MissingAmount,
    #[error("Amount must be a number, got '{0}'")]
    NonNumericAmount(String),
    #[error("Amount must be at least 1")]
    AmountTooSmall,
}

/// Body of `POST /create-checkout-session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    /// Major currency units; fractions are allowed.
    pub amount: f64,
}

impl CheckoutRequest {
    /// Builds a request from raw form input, failing fast on bad input.
    pub fn parse(
        name: Option<&str>,
        email: Option<&str>,
        raw_amount: Option<&str>,
    ) -> Result<Self, CheckoutValidationError> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(CheckoutValidationError::MissingEmail)?;

        let raw_amount = raw_amount
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(CheckoutValidationError::MissingAmount)?;
        let amount = raw_amount
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| CheckoutValidationError::NonNumericAmount(raw_amount.to_string()))?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous");

        let request = Self {
            name: name.to_string(),
            email: email.to_string(),
            amount,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), CheckoutValidationError> {
        if self.email.trim().is_empty() {
            return Err(CheckoutValidationError::MissingEmail);
        }
        if !self.amount.is_finite() {
            return Err(CheckoutValidationError::NonNumericAmount(self.amount.to_string()));
        }
        if self.amount < 1.0 {
            return Err(CheckoutValidationError::AmountTooSmall);
        }
        Ok(())
    }
}

/// `{ url }` returned when a checkout session was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// The provider's view of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub id: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionVerificationError {
    #[error("Payment is not complete (status: {0})")]
    NotPaid(String),
    #[error("Payment session has no amount")]
    MissingAmount,
    #[error("Payment session has no currency")]
    MissingCurrency,
    #[error("Payment session belongs to a different payer")]
    PayerMismatch,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.eq_ignore_ascii_case("paid")
    }

    /// Checks status, amount, currency and payer before anything is recorded.
    pub fn verify(&self, payer_email: Option<&str>) -> Result<(), SessionVerificationError> {
        if !self.is_paid() {
            return Err(SessionVerificationError::NotPaid(self.payment_status.clone()));
        }
        if !matches!(self.amount_total, Some(amount) if amount > 0) {
            return Err(SessionVerificationError::MissingAmount);
        }
        if self.currency.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(SessionVerificationError::MissingCurrency);
        }
        if let (Some(expected), Some(actual)) = (payer_email, self.customer_email.as_deref()) {
            if !expected.trim().eq_ignore_ascii_case(actual.trim()) {
                return Err(SessionVerificationError::PayerMismatch);
            }
        }
        Ok(())
    }
}

/// Response of the idempotent commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub success: bool,
    /// False when the record already existed.
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub funding: Option<FundingRecord>,
}

/// Funding list envelope: `total` is the summed amount, `totalCount` the
/// number of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingPage {
    pub fundings: Vec<FundingRecord>,
    pub total: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid_session() -> CheckoutSession {
        CheckoutSession {
            id: Some("cs_test_1".to_string()),
            payment_status: "paid".to_string(),
            amount_total: Some(50_000),
            currency: Some("usd".to_string()),
            customer_email: Some("donor@example.com".to_string()),
            payment_intent: Some("pi_1".to_string()),
        }
    }

    #[test]
    fn test_checkout_parse_rejects_bad_amounts() {
        let email = Some("donor@example.com");
        assert_eq!(
            CheckoutRequest::parse(None, email, None),
            Err(CheckoutValidationError::MissingAmount)
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("  ")),
            Err(CheckoutValidationError::MissingAmount)
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("abc")),
            Err(CheckoutValidationError::NonNumericAmount("abc".to_string()))
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("0")),
            Err(CheckoutValidationError::AmountTooSmall)
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("0.5")),
            Err(CheckoutValidationError::AmountTooSmall)
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("NaN")),
            Err(CheckoutValidationError::NonNumericAmount("NaN".to_string()))
        );
        assert_eq!(
            CheckoutRequest::parse(None, email, Some("inf")),
            Err(CheckoutValidationError::NonNumericAmount("inf".to_string()))
        );
        assert_eq!(
            CheckoutRequest::parse(None, None, Some("500")),
            Err(CheckoutValidationError::MissingEmail)
        );
    }

    #[test]
    fn test_checkout_parse_defaults_name() {
        let request = CheckoutRequest::parse(None, Some("donor@example.com"), Some(" 500 ")).unwrap();
        assert_eq!(request.name, "Anonymous");
        assert_eq!(request.amount, 500.0);
    }

    #[test]
    fn test_checkout_parse_accepts_fractions() {
        let request = CheckoutRequest::parse(Some("Rahim"), Some("donor@example.com"), Some("2.5")).unwrap();
        assert_eq!(request.amount, 2.5);
        let request = CheckoutRequest::parse(None, Some("donor@example.com"), Some("1")).unwrap();
        assert_eq!(request.amount, 1.0);
    }

    #[test]
    fn test_session_verification() {
        assert!(paid_session().verify(Some("Donor@Example.com")).is_ok());

        let mut unpaid = paid_session();
        unpaid.payment_status = "unpaid".to_string();
        assert_eq!(
            unpaid.verify(None),
            Err(SessionVerificationError::NotPaid("unpaid".to_string()))
        );

        assert_eq!(
            paid_session().verify(Some("someone@else.com")),
            Err(SessionVerificationError::PayerMismatch)
        );

        let mut free = paid_session();
        free.amount_total = Some(0);
        assert_eq!(free.verify(None), Err(SessionVerificationError::MissingAmount));
    }

    #[test]
    fn test_session_deserializes_provider_shape() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{"payment_status":"paid","amount_total":1000,"currency":"usd","customer_email":"a@b.com"}"#,
        )
        .unwrap();
        assert!(session.is_paid());
        assert_eq!(session.id, None);
    }
}

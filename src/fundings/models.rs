use donation_domain::FundingRecord;
use serde::Deserialize;
use sqlx::FromRow;

/// `fundings` row as stored
#[derive(FromRow, Debug, Clone)]
pub struct FundingRow {
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

impl From<FundingRow> for FundingRecord {
    fn from(row: FundingRow) -> Self {
        FundingRecord {
            id: row.id,
            session_id: row.session_id,
            donor_name: row.donor_name,
            donor_email: row.donor_email,
            amount: row.amount,
            currency: row.currency,
            payment_status: row.payment_status,
            payment_intent: row.payment_intent,
            paid_at: row.paid_at,
        }
    }
}

/// Body of `POST /create-checkout-session`
///
/// `amount` arrives from a form field and may be a JSON number or string.
#[derive(Deserialize, Debug, Default)]
pub struct CheckoutPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub amount: Option<serde_json::Value>,
}

impl CheckoutPayload {
    pub fn raw_amount(&self) -> Option<String> {
        match &self.amount {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// `PATCH /payment-success?session_id=`
#[derive(Deserialize, Debug, Default)]
pub struct CommitQuery {
    pub session_id: Option<String>,
}

/// `GET /fundings` query
#[derive(Deserialize, Debug, Default)]
pub struct FundingListQuery {
    /// Donor filter; admins only. Everyone else always sees their own.
    pub email: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_amount_accepts_numbers_and_strings() {
        let from = |v: serde_json::Value| CheckoutPayload {
            amount: Some(v),
            ..Default::default()
        };
        assert_eq!(from(serde_json::json!(500)).raw_amount().as_deref(), Some("500"));
        assert_eq!(from(serde_json::json!("25")).raw_amount().as_deref(), Some("25"));
        assert_eq!(from(serde_json::json!(2.5)).raw_amount().as_deref(), Some("2.5"));
        assert_eq!(from(serde_json::Value::Null).raw_amount(), None);
    }
}

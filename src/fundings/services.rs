use donation_domain::{
    CheckoutRedirect, CheckoutRequest, CheckoutSession, CommitReceipt, FundingPage, FundingRecord,
    SessionVerificationError,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::models::{CheckoutPayload, FundingListQuery, FundingRow};
use crate::auth::AuthedUser;
use crate::common::{
    generate_funding_id, like_pattern, non_blank_filter, safe_email_log, ApiError, AppConfig,
    PageRequest,
};
use crate::services::{CheckoutOrder, CheckoutProvider};

pub struct FundingsService {
    db: SqlitePool,
    checkout: Arc<dyn CheckoutProvider>,
    config: Arc<AppConfig>,
}

impl FundingsService {
    pub fn new(db: SqlitePool, checkout: Arc<dyn CheckoutProvider>, config: Arc<AppConfig>) -> Self {
        Self {
            db,
            checkout,
            config,
        }
    }

    /// Opens a hosted checkout session. Nothing is stored locally.
    pub async fn create_checkout(
        &self,
        actor: &AuthedUser,
        payload: &CheckoutPayload,
    ) -> Result<CheckoutRedirect, ApiError> {
        actor.ensure_active()?;
        let email = payload
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(actor.email.as_str());
        if !email.eq_ignore_ascii_case(actor.email.trim()) {
            warn!(
                user_id = %actor.id,
                email = %safe_email_log(email),
                "Checkout rejected: email differs from account"
            );
            return Err(ApiError::ValidationError(
                "Checkout email must match the signed-in account".into(),
            ));
        }

        let name = payload.name.as_deref().or(actor.name.as_deref());
        let raw_amount = payload.raw_amount();
        let request = CheckoutRequest::parse(name, Some(email), raw_amount.as_deref())?;

        let order = CheckoutOrder {
            request,
            currency: self.config.payment_currency.clone(),
            success_url: self.config.success_url(),
            cancel_url: self.config.cancel_url(),
        };

        let redirect = self.checkout.create_session(&order).await?;
        info!(
            user_id = %actor.id,
            amount = order.request.amount,
            session_id = ?redirect.session_id,
            "Checkout session opened"
        );
        Ok(redirect)
    }

    /// The provider's view of a session, for its payer (or an admin).
    pub async fn get_session(
        &self,
        actor: &AuthedUser,
        session_id: &str,
    ) -> Result<CheckoutSession, ApiError> {
        let retrieved = self.checkout.retrieve_session(session_id).await?;
        let session = retrieved.session;

        if !actor.is_admin() {
            if let Some(payer) = session.customer_email.as_deref() {
                if !payer.trim().eq_ignore_ascii_case(actor.email.trim()) {
                    warn!(user_id = %actor.id, session_id = %session_id, "Session lookup by non-payer");
                    return Err(SessionVerificationError::PayerMismatch.into());
                }
            }
        }

        debug!(session_id = %session_id, status = %session.payment_status, "Checkout session fetched");
        Ok(session)
    }

    pub async fn find_by_session(&self, session_id: &str) -> Result<Option<FundingRecord>, ApiError> {
        let row = sqlx::query_as::<_, FundingRow>("SELECT * FROM fundings WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(row.map(FundingRecord::from))
    }

    /// Records a paid session exactly once.
    ///
    /// Repeat calls for the same session report success without writing.
    /// The UNIQUE constraint on `session_id` settles concurrent commits.
    pub async fn commit(&self, actor: &AuthedUser, session_id: &str) -> Result<CommitReceipt, ApiError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ApiError::ValidationError("session_id is required".into()));
        }

        if let Some(existing) = self.find_by_session(session_id).await? {
            return self.already_committed(actor, existing);
        }

        let retrieved = self.checkout.retrieve_session(session_id).await?;
        let session = retrieved.session;
        if let Err(err) = session.verify(Some(actor.email.as_str())) {
            warn!(
                user_id = %actor.id,
                session_id = %session_id,
                reason = %err,
                "Payment verification failed"
            );
            return Err(err.into());
        }

        // verify() guarantees both are present.
        let amount = session.amount_total.unwrap_or_default();
        let currency = session.currency.clone().unwrap_or_default().to_lowercase();
        let donor_email = session
            .customer_email
            .clone()
            .unwrap_or_else(|| actor.email.clone());
        let donor_name = retrieved.donor_name.or_else(|| actor.name.clone());
        let funding_id = generate_funding_id();
        let paid_at = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO fundings (
                id, session_id, donor_name, donor_email, amount, currency,
                payment_status, payment_intent, paid_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(&funding_id)
        .bind(session_id)
        .bind(&donor_name)
        .bind(&donor_email)
        .bind(amount)
        .bind(&currency)
        .bind(session.payment_status.to_lowercase())
        .bind(&session.payment_intent)
        .bind(&paid_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, session_id = %session_id, "Failed to record funding");
            ApiError::DatabaseError(e)
        })?;

        let created = result.rows_affected() == 1;
        let funding = self
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| ApiError::InternalServer("Funding record missing after commit".into()))?;

        if created {
            info!(
                funding_id = %funding.id,
                session_id = %session_id,
                email = %safe_email_log(&funding.donor_email),
                amount = funding.amount,
                currency = %funding.currency,
                "Funding recorded"
            );
        } else {
            debug!(session_id = %session_id, "Concurrent commit already recorded this session");
        }

        Ok(CommitReceipt {
            success: true,
            created,
            funding: Some(funding),
        })
    }

    fn already_committed(
        &self,
        actor: &AuthedUser,
        existing: FundingRecord,
    ) -> Result<CommitReceipt, ApiError> {
        if !actor.is_admin() && !existing.donor_email.eq_ignore_ascii_case(&actor.email) {
            warn!(user_id = %actor.id, session_id = %existing.session_id, "Commit replay by non-payer");
            return Err(SessionVerificationError::PayerMismatch.into());
        }
        debug!(session_id = %existing.session_id, "Funding already recorded; commit is a no-op");
        Ok(CommitReceipt {
            success: true,
            created: false,
            funding: Some(existing),
        })
    }

    /// Funding history with lifetime totals.
    ///
    /// `total` is the summed amount of every matching record, not just the
    /// current page.
    pub async fn list(&self, actor: &AuthedUser, query: &FundingListQuery) -> Result<FundingPage, ApiError> {
        let email = if actor.is_admin() {
            non_blank_filter(query.email.as_deref()).map(str::to_string)
        } else {
            Some(actor.email.clone())
        };
        let search = like_pattern(query.search.as_deref());
        let window = PageRequest::new(query.page, query.limit);

        let filter = r#"
            WHERE (? IS NULL OR donor_email = ?)
              AND (? IS NULL
                   OR donor_name LIKE ? ESCAPE '\'
                   OR donor_email LIKE ? ESCAPE '\'
                   OR session_id LIKE ? ESCAPE '\'
                   OR payment_status LIKE ? ESCAPE '\')
        "#;

        let (count, sum): (i64, i64) = sqlx::query_as(&format!(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM fundings {}",
            filter
        ))
        .bind(&email)
        .bind(&email)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let rows = sqlx::query_as::<_, FundingRow>(&format!(
            "SELECT * FROM fundings {} ORDER BY paid_at DESC, rowid DESC LIMIT ? OFFSET ?",
            filter
        ))
        .bind(&email)
        .bind(&email)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let page = window.into_page(rows, count);
        Ok(FundingPage {
            fundings: page.result.into_iter().map(FundingRecord::from).collect(),
            total: sum,
            total_count: page.total,
            total_pages: page.total_pages,
            page: page.page,
            limit: page.limit,
        })
    }
}

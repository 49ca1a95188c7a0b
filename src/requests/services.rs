// src/requests/services.rs

use donation_domain::{BloodGroup, DonationRequest, Page, RequestStatus, StatusCounts, TransitionError};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use super::models::{
    DonationRequestRow, PendingQuery, PendingSearchQuery, RequestListQuery, RequestPayload,
};
use super::validators::RequestPayloadValidator;
use crate::auth::AuthedUser;
use crate::common::{
    generate_request_id, like_pattern, non_blank_filter, safe_email_log, ApiError, PageRequest,
    Validator,
};

const SELECT_REQUEST: &str = "SELECT * FROM donation_requests";

fn into_requests(rows: Vec<DonationRequestRow>) -> Result<Vec<DonationRequest>, ApiError> {
    rows.into_iter().map(DonationRequest::try_from).collect()
}

fn parse_status(raw: Option<&str>) -> Result<Option<RequestStatus>, ApiError> {
    non_blank_filter(raw)
        .filter(|s| !s.eq_ignore_ascii_case("all"))
        .map(|s| s.parse::<RequestStatus>().map_err(ApiError::ValidationError))
        .transpose()
}

fn trimmed(value: &str) -> &str {
    value.trim()
}

fn optional_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn log_rejection(actor: &AuthedUser, request_id: &str, action: &str, err: &TransitionError) {
    warn!(
        user_id = %actor.id,
        request_id = %request_id,
        action = action,
        reason = %err,
        "Donation request change rejected"
    );
}

pub struct RequestsService {
    db: SqlitePool,
}

impl RequestsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Reads
    // ============================================================================

    pub async fn find(&self, request_id: &str) -> Result<Option<DonationRequest>, ApiError> {
        let row = sqlx::query_as::<_, DonationRequestRow>(&format!("{} WHERE id = ?", SELECT_REQUEST))
            .bind(request_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        row.map(DonationRequest::try_from).transpose()
    }

    pub async fn get(&self, request_id: &str) -> Result<DonationRequest, ApiError> {
        self.find(request_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Donation request not found".to_string()))
    }

    /// Donors see their own requests; volunteers and admins see all of them
    /// and may narrow by requester email.
    pub async fn list(
        &self,
        actor: &AuthedUser,
        query: &RequestListQuery,
    ) -> Result<Page<DonationRequest>, ApiError> {
        let status = parse_status(query.status.as_deref())?;
        let status = status.map(|s| s.as_str());
        let search = like_pattern(query.search.as_deref());
        let window = PageRequest::new(query.page, query.limit);

        let email = if actor.is_privileged() {
            non_blank_filter(query.email.as_deref()).map(str::to_string)
        } else {
            Some(actor.email.clone())
        };

        let filter = r#"
            WHERE (? IS NULL OR donor_email = ?)
              AND (? IS NULL OR status = ?)
              AND (? IS NULL
                   OR recipient_name LIKE ? ESCAPE '\'
                   OR hospital_name LIKE ? ESCAPE '\'
                   OR recipient_district LIKE ? ESCAPE '\'
                   OR recipient_upazila LIKE ? ESCAPE '\'
                   OR blood_group LIKE ? ESCAPE '\')
        "#;

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM donation_requests {}", filter))
                .bind(&email)
                .bind(&email)
                .bind(status)
                .bind(status)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .bind(&search)
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let rows = sqlx::query_as::<_, DonationRequestRow>(&format!(
            "{} {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            SELECT_REQUEST, filter
        ))
        .bind(&email)
        .bind(&email)
        .bind(status)
        .bind(status)
        .bind(&search)
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

        debug!(
            user_id = %actor.id,
            total = total,
            page = window.page,
            "Listed donation requests"
        );
        Ok(window.into_page(into_requests(rows)?, total))
    }

    /// Public list of requests still waiting for a donor.
    pub async fn list_pending(&self, query: &PendingQuery) -> Result<Page<DonationRequest>, ApiError> {
        let window = PageRequest::new(query.page, query.limit);

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM donation_requests WHERE status = 'pending'")
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let rows = sqlx::query_as::<_, DonationRequestRow>(&format!(
            "{} WHERE status = 'pending' ORDER BY donation_date ASC, donation_time ASC, rowid ASC LIMIT ? OFFSET ?",
            SELECT_REQUEST
        ))
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(window.into_page(into_requests(rows)?, total))
    }

    /// Pending requests narrowed by location and blood group.
    pub async fn search_pending(
        &self,
        query: &PendingSearchQuery,
    ) -> Result<Page<DonationRequest>, ApiError> {
        let district = non_blank_filter(query.district.as_deref());
        let upazila = non_blank_filter(query.upazila.as_deref());
        let blood_group = non_blank_filter(query.blood_group.as_deref())
            .map(|g| g.parse::<BloodGroup>().map_err(ApiError::ValidationError))
            .transpose()?
            .map(|g| g.as_str());
        let window = PageRequest::new(query.page, query.limit);

        let filter = r#"
            WHERE status = 'pending'
              AND (? IS NULL OR recipient_district = ? COLLATE NOCASE)
              AND (? IS NULL OR recipient_upazila = ? COLLATE NOCASE)
              AND (? IS NULL OR blood_group = ?)
        "#;

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM donation_requests {}", filter))
                .bind(district)
                .bind(district)
                .bind(upazila)
                .bind(upazila)
                .bind(blood_group)
                .bind(blood_group)
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let rows = sqlx::query_as::<_, DonationRequestRow>(&format!(
            "{} {} ORDER BY donation_date ASC, donation_time ASC, rowid ASC LIMIT ? OFFSET ?",
            SELECT_REQUEST, filter
        ))
        .bind(district)
        .bind(district)
        .bind(upazila)
        .bind(upazila)
        .bind(blood_group)
        .bind(blood_group)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(window.into_page(into_requests(rows)?, total))
    }

    pub async fn status_counts(&self) -> Result<StatusCounts, ApiError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM donation_requests GROUP BY status")
                .fetch_all(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.parse::<RequestStatus>() {
                Ok(status) => counts.record(status, count),
                Err(e) => warn!(error = %e, "Skipping unknown status in counts"),
            }
        }
        Ok(counts)
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    pub async fn create(
        &self,
        actor: &AuthedUser,
        payload: RequestPayload,
    ) -> Result<DonationRequest, ApiError> {
        actor.ensure_active()?;
        RequestPayloadValidator.validate(&payload).into_result()?;

        let request_id = generate_request_id();
        let donor_name = optional_trimmed(payload.donor_name.as_deref()).or_else(|| actor.name.clone());
        let blood_group = payload
            .blood_group
            .parse::<BloodGroup>()
            .map_err(ApiError::ValidationError)?;

        sqlx::query(
            r#"
            INSERT INTO donation_requests (
                id, donor_id, donor_name, donor_email, recipient_name, hospital_name,
                full_address, recipient_district, recipient_upazila, blood_group,
                donation_date, donation_time, message, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(&request_id)
        .bind(&actor.id)
        .bind(&donor_name)
        .bind(&actor.email)
        .bind(trimmed(&payload.recipient_name))
        .bind(trimmed(&payload.hospital_name))
        .bind(optional_trimmed(payload.full_address.as_deref()))
        .bind(trimmed(&payload.recipient_district))
        .bind(trimmed(&payload.recipient_upazila))
        .bind(blood_group.as_str())
        .bind(trimmed(&payload.donation_date))
        .bind(trimmed(&payload.donation_time))
        .bind(optional_trimmed(payload.message.as_deref()))
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %actor.id, "Failed to create donation request");
            ApiError::DatabaseError(e)
        })?;

        info!(
            request_id = %request_id,
            user_id = %actor.id,
            email = %safe_email_log(&actor.email),
            blood_group = %blood_group,
            "Donation request created"
        );
        self.get(&request_id).await
    }

    /// Owner edit of a pending request.
    pub async fn update(
        &self,
        actor: &AuthedUser,
        request_id: &str,
        payload: RequestPayload,
    ) -> Result<DonationRequest, ApiError> {
        actor.ensure_active()?;
        let current = self.get(request_id).await?;
        if let Err(err) = current.check_edit(&actor.actor()) {
            log_rejection(actor, request_id, "edit", &err);
            return Err(err.into());
        }
        RequestPayloadValidator.validate(&payload).into_result()?;

        let blood_group = payload
            .blood_group
            .parse::<BloodGroup>()
            .map_err(ApiError::ValidationError)?;
        let donor_name = optional_trimmed(payload.donor_name.as_deref()).or(current.donor_name.clone());

        let result = sqlx::query(
            r#"
            UPDATE donation_requests SET
                donor_name = ?, recipient_name = ?, hospital_name = ?, full_address = ?,
                recipient_district = ?, recipient_upazila = ?, blood_group = ?,
                donation_date = ?, donation_time = ?, message = ?,
                updated_at = datetime('now')
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(&donor_name)
        .bind(trimmed(&payload.recipient_name))
        .bind(trimmed(&payload.hospital_name))
        .bind(optional_trimmed(payload.full_address.as_deref()))
        .bind(trimmed(&payload.recipient_district))
        .bind(trimmed(&payload.recipient_upazila))
        .bind(blood_group.as_str())
        .bind(trimmed(&payload.donation_date))
        .bind(trimmed(&payload.donation_time))
        .bind(optional_trimmed(payload.message.as_deref()))
        .bind(request_id)
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to update donation request");
            ApiError::DatabaseError(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(self.lost_race(actor, request_id, |r, a| r.check_edit(a)).await);
        }

        info!(request_id = %request_id, user_id = %actor.id, "Donation request updated");
        self.get(request_id).await
    }

    /// Moves a request along its lifecycle.
    ///
    /// The update is a compare-and-swap on the status the check was made
    /// against, so two racing advances cannot both apply.
    pub async fn change_status(
        &self,
        actor: &AuthedUser,
        request_id: &str,
        next: RequestStatus,
    ) -> Result<DonationRequest, ApiError> {
        actor.ensure_active()?;
        let current = self.get(request_id).await?;
        if let Err(err) = current.check_status_change(next, &actor.actor()) {
            log_rejection(actor, request_id, "status", &err);
            return Err(err.into());
        }

        let result = sqlx::query(
            r#"
            UPDATE donation_requests SET status = ?, updated_at = datetime('now')
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(request_id)
        .bind(current.status.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to change request status");
            ApiError::DatabaseError(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(self
                .lost_race(actor, request_id, |r, a| r.check_status_change(next, a))
                .await);
        }

        info!(
            request_id = %request_id,
            user_id = %actor.id,
            from = %current.status,
            to = %next,
            "Donation request status changed"
        );
        self.get(request_id).await
    }

    /// Owner delete of a pending request.
    pub async fn delete(&self, actor: &AuthedUser, request_id: &str) -> Result<(), ApiError> {
        actor.ensure_active()?;
        let current = self.get(request_id).await?;
        if let Err(err) = current.check_delete(&actor.actor()) {
            log_rejection(actor, request_id, "delete", &err);
            return Err(err.into());
        }

        let result = sqlx::query("DELETE FROM donation_requests WHERE id = ? AND status = 'pending'")
            .bind(request_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to delete donation request");
                ApiError::DatabaseError(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(self.lost_race(actor, request_id, |r, a| r.check_delete(a)).await);
        }

        info!(request_id = %request_id, user_id = %actor.id, "Donation request deleted");
        Ok(())
    }

    /// Explains a compare-and-swap that matched no row by re-checking the
    /// operation against the current state.
    async fn lost_race<F>(&self, actor: &AuthedUser, request_id: &str, check: F) -> ApiError
    where
        F: Fn(&DonationRequest, &donation_domain::RequestActor) -> Result<(), TransitionError>,
    {
        match self.find(request_id).await {
            Ok(Some(fresh)) => match check(&fresh, &actor.actor()) {
                Err(err) => {
                    log_rejection(actor, request_id, "concurrent", &err);
                    err.into()
                }
                Ok(()) => ApiError::Conflict(
                    "Request was changed by someone else; reload and try again".into(),
                ),
            },
            Ok(None) => ApiError::NotFound("Donation request not found".to_string()),
            Err(e) => e,
        }
    }
}

// src/requests/models.rs

use donation_domain::{BloodGroup, DonationRequest, RequestStatus, StatusCounts};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::ApiError;

/// `donation_requests` row as stored
#[derive(FromRow, Debug, Clone)]
pub struct DonationRequestRow {
    pub id: String,
    pub donor_id: String,
    pub donor_name: Option<String>,
    pub donor_email: String,
    pub recipient_name: String,
    pub hospital_name: String,
    pub full_address: Option<String>,
    pub recipient_district: String,
    pub recipient_upazila: String,
    pub blood_group: String,
    pub donation_date: String,
    pub donation_time: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl TryFrom<DonationRequestRow> for DonationRequest {
    type Error = ApiError;

    fn try_from(row: DonationRequestRow) -> Result<Self, Self::Error> {
        let blood_group = row
            .blood_group
            .parse::<BloodGroup>()
            .map_err(|e| ApiError::InternalServer(format!("request {}: {}", row.id, e)))?;
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|e| ApiError::InternalServer(format!("request {}: {}", row.id, e)))?;

        Ok(DonationRequest {
            id: row.id,
            donor_id: row.donor_id,
            donor_name: row.donor_name,
            donor_email: row.donor_email,
            recipient_name: row.recipient_name,
            hospital_name: row.hospital_name,
            full_address: row.full_address,
            recipient_district: row.recipient_district,
            recipient_upazila: row.recipient_upazila,
            blood_group,
            donation_date: row.donation_date,
            donation_time: row.donation_time,
            message: row.message,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Body of `POST /requests` and `PUT /requests/:id`
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub hospital_name: String,
    pub full_address: Option<String>,
    #[serde(default)]
    pub recipient_district: String,
    #[serde(default)]
    pub recipient_upazila: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default)]
    pub donation_date: String,
    #[serde(default)]
    pub donation_time: String,
    pub message: Option<String>,
    pub donor_name: Option<String>,
}

/// `GET /requests` query
#[derive(Deserialize, Debug, Default)]
pub struct RequestListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    /// Requester filter; only honoured for volunteers and admins.
    pub email: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /requests/pending` query
#[derive(Deserialize, Debug, Default)]
pub struct PendingQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /requests/search` query
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PendingSearchQuery {
    pub district: Option<String>,
    pub upazila: Option<String>,
    pub blood_group: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `PATCH /requests/:id/status` body
#[derive(Deserialize, Debug)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub completion_rate: i64,
}

impl From<StatusCounts> for RequestStats {
    fn from(counts: StatusCounts) -> Self {
        Self {
            completion_rate: counts.completion_rate(),
            counts,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

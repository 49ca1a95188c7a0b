//! Donation request lifecycle
//!
//! ```text
//! pending    --edit/delete (owner)-------> pending / removed
//! pending    --advance (volunteer/admin)--> inprogress
//! inprogress --advance (volunteer/admin)--> done | cancelled
//! pending    --cancel (volunteer/admin, owner)--> cancelled
//! done, cancelled: terminal
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::blood::BloodGroup;
use crate::role::Role;

/// Canonical spelling is `cancelled`; `canceled` is accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    #[serde(alias = "in_progress")]
    InProgress,
    Done,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Done,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "inprogress",
            RequestStatus::Done => "done",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Done | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "inprogress" | "in_progress" => Ok(RequestStatus::InProgress),
            "done" => Ok(RequestStatus::Done),
            "cancelled" | "canceled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Request is already {0}; no further changes are allowed")]
    Terminal(RequestStatus),
    #[error("Only pending requests can be changed this way (current status: {0})")]
    NotPending(RequestStatus),
    #[error("Cannot move a request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("Only the requester can do this")]
    NotOwner,
    #[error("Not allowed to move a request from {from} to {to}")]
    NotPermitted {
        from: RequestStatus,
        to: RequestStatus,
    },
}

impl TransitionError {
    /// Permission failures, as opposed to state conflicts.
    pub fn is_permission(&self) -> bool {
        matches!(
            self,
            TransitionError::NotOwner | TransitionError::NotPermitted { .. }
        )
    }
}

/// Who is attempting a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestActor {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl RequestActor {
    pub fn owns(&self, request: &DonationRequest) -> bool {
        request.donor_id == self.user_id
            || (!self.email.is_empty() && request.donor_email.eq_ignore_ascii_case(&self.email))
    }
}

pub fn check_status_change(
    current: RequestStatus,
    next: RequestStatus,
    role: Role,
    is_owner: bool,
) -> Result<(), TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }

    let allowed = match (current, next) {
        (RequestStatus::Pending, RequestStatus::InProgress) => role.is_privileged(),
        (RequestStatus::InProgress, RequestStatus::Done | RequestStatus::Cancelled) => {
            role.is_privileged()
        }
        (RequestStatus::Pending, RequestStatus::Cancelled) => role.is_privileged() || is_owner,
        (from, to) => return Err(TransitionError::InvalidTransition { from, to }),
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError::NotPermitted {
            from: current,
            to: next,
        })
    }
}

/// Editing the request details: owner only, while pending.
pub fn check_edit(current: RequestStatus, is_owner: bool) -> Result<(), TransitionError> {
    owner_while_pending(current, is_owner)
}

/// Deleting a request: owner only, while pending.
pub fn check_delete(current: RequestStatus, is_owner: bool) -> Result<(), TransitionError> {
    owner_while_pending(current, is_owner)
}

fn owner_while_pending(current: RequestStatus, is_owner: bool) -> Result<(), TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }
    if current != RequestStatus::Pending {
        return Err(TransitionError::NotPending(current));
    }
    if !is_owner {
        return Err(TransitionError::NotOwner);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub id: String,
    pub donor_id: String,
    pub donor_name: Option<String>,
    pub donor_email: String,
    pub recipient_name: String,
    pub hospital_name: String,
    pub full_address: Option<String>,
    pub recipient_district: String,
    pub recipient_upazila: String,
    pub blood_group: BloodGroup,
    pub donation_date: String,
    pub donation_time: String,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl DonationRequest {
    pub fn check_status_change(
        &self,
        next: RequestStatus,
        actor: &RequestActor,
    ) -> Result<(), TransitionError> {
        check_status_change(self.status, next, actor.role, actor.owns(self))
    }

    pub fn check_edit(&self, actor: &RequestActor) -> Result<(), TransitionError> {
        check_edit(self.status, actor.owns(self))
    }

    pub fn check_delete(&self, actor: &RequestActor) -> Result<(), TransitionError> {
        check_delete(self.status, actor.owns(self))
    }
}

/// Per-status request counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub inprogress: i64,
    pub done: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn record(&mut self, status: RequestStatus, count: i64) {
        match status {
            RequestStatus::Pending => self.pending += count,
            RequestStatus::InProgress => self.inprogress += count,
            RequestStatus::Done => self.done += count,
            RequestStatus::Cancelled => self.cancelled += count,
        }
        self.total += count;
    }

    /// Share of requests that reached `done`, as a rounded percentage.
    pub fn completion_rate(&self) -> i64 {
        if self.total <= 0 {
            return 0;
        }
        (self.done * 100 + self.total / 2) / self.total
    }
}

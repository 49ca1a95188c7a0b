//! Paginated list plumbing
//!
//! - [`normalize_page`] turns either server list shape into a [`Page`]
//! - [`ListQuery`] keeps filters and re-anchors the page when they change
//! - [`Debouncer`] holds at most one pending timer per input
//! - [`LatestTickets`] discards responses for superseded list calls

use donation_domain::pagination::DEFAULT_LIMIT;
use donation_domain::{clamp_page, total_pages, Page};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::PortalError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, PortalError> {
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| PortalError::Decode(e.to_string()))
}

/// Normalizes a list response.
///
/// A bare array is one complete page. An envelope may carry its items under
/// `result` or `list_key` (`fundings` for funding history); when it carries
/// `totalCount`, that is the record count and `total` is something else.
pub fn normalize_page<T: DeserializeOwned>(
    body: Value,
    list_key: &str,
    fallback_limit: i64,
) -> Result<Page<T>, PortalError> {
    let fallback_limit = if fallback_limit > 0 {
        fallback_limit
    } else {
        DEFAULT_LIMIT
    };

    match body {
        Value::Array(items) => {
            let result: Vec<T> = decode_items(items)?;
            let total = result.len() as i64;
            Ok(Page {
                result,
                total,
                page: 1,
                limit: fallback_limit,
                total_pages: 1,
            })
        }
        Value::Object(mut map) => {
            let items = match map.remove("result").or_else(|| map.remove(list_key)) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(PortalError::Decode(format!(
                        "list field is not an array: {}",
                        other
                    )))
                }
            };
            let result: Vec<T> = decode_items(items)?;

            let int = |key: &str| map.get(key).and_then(Value::as_i64);
            let total = int("totalCount")
                .or_else(|| int("total"))
                .unwrap_or(result.len() as i64)
                .max(0);
            let limit = int("limit").filter(|l| *l > 0).unwrap_or(fallback_limit);
            let page = int("page").filter(|p| *p > 0).unwrap_or(1);
            let pages = int("totalPages")
                .filter(|p| *p > 0)
                .unwrap_or_else(|| total_pages(total, limit));

            Ok(Page {
                result,
                total,
                page,
                limit,
                total_pages: pages,
            })
        }
        Value::Null => Ok(Page::new(Vec::new(), 0, 1, fallback_limit)),
        other => Err(PortalError::Decode(format!("expected a list, got {}", other))),
    }
}

/// Filters and position of one list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: String,
    /// Requester/donor filter, honoured by the server for privileged callers.
    pub email: Option<String>,
    pub page: i64,
    pub limit: i64,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ListQuery {
    pub fn new(limit: i64) -> Self {
        Self {
            status: None,
            search: String::new(),
            email: None,
            page: 1,
            limit: if limit > 0 { limit } else { DEFAULT_LIMIT },
        }
    }

    /// Returns whether anything changed. Any change goes back to page 1.
    pub fn set_status(&mut self, status: Option<&str>) -> bool {
        let status = non_blank(status).filter(|s| !s.eq_ignore_ascii_case("all"));
        if self.status == status {
            return false;
        }
        self.status = status;
        self.page = 1;
        true
    }

    pub fn set_search(&mut self, text: &str) -> bool {
        let text = text.trim().to_string();
        if self.search == text {
            return false;
        }
        self.search = text;
        self.page = 1;
        true
    }

    pub fn set_email(&mut self, email: Option<&str>) -> bool {
        let email = non_blank(email);
        if self.email == email {
            return false;
        }
        self.email = email;
        self.page = 1;
        true
    }

    pub fn set_limit(&mut self, limit: i64) -> bool {
        if limit <= 0 || limit == self.limit {
            return false;
        }
        self.limit = limit;
        self.page = 1;
        true
    }

    /// Moving between pages keeps every filter.
    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(1);
    }

    /// Pulls `page` back into `[1, total_pages]`; returns whether it moved.
    pub fn clamp_to(&mut self, total_pages: i64) -> bool {
        let clamped = clamp_page(self.page, total_pages);
        let moved = clamped != self.page;
        self.page = clamped;
        moved
    }

    /// Only `page` and `limit`.
    pub fn page_params(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = self.page_params();
        if let Some(status) = &self.status {
            params.push(("status".to_string(), status.clone()));
        }
        if !self.search.is_empty() {
            params.push(("search".to_string(), self.search.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        params
    }
}

/// A cancellable quiet-period timer.
///
/// Scheduling replaces whatever was pending, so only the last call within a
/// quiet window runs.
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    /// Must be called from inside a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let quiet = self.quiet;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            task.await;
        });
        if let Some(previous) = lock(&self.pending).replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: String,
    seq: u64,
}

/// Last-write-wins bookkeeping for overlapping calls, one counter per key.
#[derive(Default)]
pub struct LatestTickets {
    latest: Mutex<HashMap<String, u64>>,
}

impl LatestTickets {
    pub fn issue(&self, key: &str) -> Ticket {
        let mut latest = lock(&self.latest);
        let seq = latest.entry(key.to_string()).or_insert(0);
        *seq += 1;
        Ticket {
            key: key.to_string(),
            seq: *seq,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        lock(&self.latest).get(&ticket.key) == Some(&ticket.seq)
    }
}

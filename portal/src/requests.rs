//! Donation request lifecycle, client side
//!
//! The manager owns one list view (filters, debounced search, page) and the
//! mutations on individual requests. Every mutation is checked against the
//! same state machine the server enforces before it is sent, and nothing is
//! applied locally until the server confirms it.

use donation_domain::{BloodGroup, DonationRequest, Page, RequestActor, RequestStatus};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::http::ApiClient;
use crate::inflight::InFlight;
use crate::query::{normalize_page, Debouncer, LatestTickets, ListQuery};

/// Fields a requester fills in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    pub recipient_name: String,
    pub hospital_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    pub recipient_district: String,
    pub recipient_upazila: String,
    pub blood_group: BloodGroup,
    /// `YYYY-MM-DD`
    pub donation_date: String,
    /// `HH:MM`
    pub donation_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub pending: i64,
    pub inprogress: i64,
    pub done: i64,
    pub cancelled: i64,
    pub total: i64,
    #[serde(default)]
    pub completion_rate: i64,
}

/// Location and blood group filters for the public pending search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSearch {
    pub district: Option<String>,
    pub upazila: Option<String>,
    pub blood_group: Option<BloodGroup>,
}

impl PendingSearch {
    fn params(&self, page: i64, limit: i64) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(district) = self.district.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            params.push(("district".to_string(), district.to_string()));
        }
        if let Some(upazila) = self.upazila.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            params.push(("upazila".to_string(), upazila.to_string()));
        }
        if let Some(group) = self.blood_group {
            params.push(("bloodGroup".to_string(), group.as_str().to_string()));
        }
        params
    }
}

const LIST_KEY: &str = "requests";

struct Inner {
    api: ApiClient,
    path: &'static str,
    /// The pending view takes no status, search or email filters.
    filtered: bool,
    query: Mutex<ListQuery>,
    debouncer: Debouncer,
    tickets: LatestTickets,
    in_flight: InFlight,
    results: watch::Sender<Option<Page<DonationRequest>>>,
}

/// Cheap to clone; clones share one list view.
#[derive(Clone)]
pub struct RequestManager {
    inner: Arc<Inner>,
}

fn lock(query: &Mutex<ListQuery>) -> MutexGuard<'_, ListQuery> {
    query.lock().unwrap_or_else(PoisonError::into_inner)
}

fn status_label(status: Option<RequestStatus>) -> Option<&'static str> {
    status.map(|s| s.as_str())
}

impl RequestManager {
    /// The caller's requests (donors) or every request (volunteers, admins).
    pub fn new(api: ApiClient, config: &PortalConfig) -> Self {
        Self::with_path(api, config, "/requests", true)
    }

    /// The public list of requests still waiting for a donor.
    pub fn pending(api: ApiClient, config: &PortalConfig) -> Self {
        Self::with_path(api, config, "/requests/pending", false)
    }

    fn with_path(api: ApiClient, config: &PortalConfig, path: &'static str, filtered: bool) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                path,
                filtered,
                query: Mutex::new(ListQuery::new(config.default_limit)),
                debouncer: Debouncer::new(config.search_quiet),
                tickets: LatestTickets::default(),
                in_flight: InFlight::default(),
                results,
            }),
        }
    }

    pub fn query(&self) -> ListQuery {
        lock(&self.inner.query).clone()
    }

    /// Latest applied page; `None` until the first list call lands.
    pub fn subscribe(&self) -> watch::Receiver<Option<Page<DonationRequest>>> {
        self.inner.results.subscribe()
    }

    pub fn is_busy(&self, request_id: &str) -> bool {
        self.inner.in_flight.is_busy(request_id)
    }

    // ========================================================================
    // List view
    // ========================================================================

    pub fn set_status_filter(&self, status: Option<RequestStatus>) -> bool {
        lock(&self.inner.query).set_status(status_label(status))
    }

    pub fn set_email_filter(&self, email: Option<&str>) -> bool {
        lock(&self.inner.query).set_email(email)
    }

    pub fn set_page(&self, page: i64) {
        lock(&self.inner.query).set_page(page);
    }

    pub fn set_limit(&self, limit: i64) -> bool {
        lock(&self.inner.query).set_limit(limit)
    }

    /// Records a search keystroke; the list call follows once input has been
    /// quiet for the configured interval.
    pub fn type_search(&self, text: &str) {
        if !lock(&self.inner.query).set_search(text) {
            return;
        }
        let manager = self.clone();
        self.inner.debouncer.schedule(async move {
            match manager.refresh().await {
                Ok(_) => {}
                Err(PortalError::Stale) => debug!("Debounced search superseded"),
                Err(e) => warn!(error = %e, "Debounced search failed"),
            }
        });
    }

    /// Fetches the current page and publishes it.
    ///
    /// When the server reports fewer pages than the one selected, the page is
    /// clamped and fetched once more.
    pub async fn refresh(&self) -> Result<Page<DonationRequest>, PortalError> {
        let mut reclamped = false;
        loop {
            let query = self.query();
            let params = if self.inner.filtered {
                query.params()
            } else {
                query.page_params()
            };
            let ticket = self.inner.tickets.issue(LIST_KEY);
            let body = self
                .inner
                .api
                .call(Method::GET, self.inner.path, params, None)
                .await?;
            if !self.inner.tickets.is_current(&ticket) {
                debug!(page = query.page, "Stale request list dropped");
                return Err(PortalError::Stale);
            }

            let page: Page<DonationRequest> = normalize_page(body, "result", query.limit)?;

            let moved = {
                let mut current = lock(&self.inner.query);
                *current == query && current.clamp_to(page.total_pages)
            };
            if moved && !reclamped {
                reclamped = true;
                debug!(
                    requested = query.page,
                    total_pages = page.total_pages,
                    "Selected page no longer exists; settling on the last one"
                );
                continue;
            }

            self.inner.results.send_replace(Some(page.clone()));
            return Ok(page);
        }
    }

    /// One page of the public pending search; not tied to the list view.
    pub async fn search_pending(
        &self,
        search: &PendingSearch,
        page: i64,
        limit: i64,
    ) -> Result<Page<DonationRequest>, PortalError> {
        let body = self
            .inner
            .api
            .call(Method::GET, "/requests/search", search.params(page.max(1), limit), None)
            .await?;
        normalize_page(body, "result", limit)
    }

    pub async fn stats(&self) -> Result<RequestStats, PortalError> {
        self.inner.api.get("/requests/stats", Vec::new()).await
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn get(&self, request_id: &str) -> Result<DonationRequest, PortalError> {
        let path = format!("/requests/{}", urlencoding::encode(request_id));
        self.inner.api.get(&path, Vec::new()).await
    }

    pub async fn create(&self, draft: &RequestDraft) -> Result<DonationRequest, PortalError> {
        let body = serde_json::to_value(draft).map_err(|e| PortalError::Decode(e.to_string()))?;
        let created: DonationRequest = self
            .inner
            .api
            .send_json(Method::POST, "/requests", Some(body))
            .await?;
        info!(request_id = %created.id, "Donation request created");
        Ok(created)
    }

    pub async fn edit(
        &self,
        actor: &RequestActor,
        request: &DonationRequest,
        draft: &RequestDraft,
    ) -> Result<DonationRequest, PortalError> {
        request.check_edit(actor)?;
        let _guard = self.inner.in_flight.begin(&request.id)?;

        let body = serde_json::to_value(draft).map_err(|e| PortalError::Decode(e.to_string()))?;
        let path = format!("/requests/{}", urlencoding::encode(&request.id));
        self.inner.api.send_json(Method::PUT, &path, Some(body)).await
    }

    /// Moves a request along its lifecycle. The returned record is the
    /// server's; nothing is changed locally beforehand.
    pub async fn change_status(
        &self,
        actor: &RequestActor,
        request: &DonationRequest,
        next: RequestStatus,
    ) -> Result<DonationRequest, PortalError> {
        request.check_status_change(next, actor)?;
        let _guard = self.inner.in_flight.begin(&request.id)?;

        let path = format!("/requests/{}/status", urlencoding::encode(&request.id));
        let updated: DonationRequest = self
            .inner
            .api
            .send_json(Method::PATCH, &path, Some(json!({ "status": next })))
            .await?;
        info!(request_id = %updated.id, status = %updated.status, "Request status changed");
        Ok(updated)
    }

    /// Deletes a pending request and reloads the list so an emptied last
    /// page is re-clamped.
    pub async fn delete(&self, actor: &RequestActor, request: &DonationRequest) -> Result<(), PortalError> {
        request.check_delete(actor)?;
        {
            let _guard = self.inner.in_flight.begin(&request.id)?;
            let path = format!("/requests/{}", urlencoding::encode(&request.id));
            self.inner.api.call(Method::DELETE, &path, Vec::new(), None).await?;
        }
        info!(request_id = %request.id, "Donation request deleted");

        if let Err(e) = self.refresh().await {
            if !e.is_stale() {
                warn!(error = %e, "List reload after delete failed");
            }
        }
        Ok(())
    }
}

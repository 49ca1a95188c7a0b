//! Outbound calls to the donation API
//!
//! [`ApiClient`] is the single path every component uses. It:
//! - attaches the bearer token when there is one and leaves the header off otherwise
//! - invalidates the session on 401/403
//! - discards responses that land after the session changed
//! - turns error bodies into [`PortalError`]s that keep the server's message

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PortalError, GENERIC_MESSAGE, NETWORK_MESSAGE};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Sent as `Authorization: Bearer ...` when present.
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PortalError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PortalError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.bearer.as_deref().filter(|t| !t.trim().is_empty()) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, method = %request.method, path = %request.path, "Request failed");
            PortalError::Network(NETWORK_MESSAGE.to_string())
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            warn!(error = %e, path = %request.path, "Failed to read response body");
            PortalError::Network(NETWORK_MESSAGE.to_string())
        })?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(HttpResponse { status, body })
    }
}

/// The server's `message`, if it sent a usable one.
pub fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn error_for_status(status: u16, body: &Value) -> PortalError {
    let message = server_message(body).unwrap_or_else(|| GENERIC_MESSAGE.to_string());
    match status {
        400 | 422 => PortalError::Validation(message),
        401 | 403 => PortalError::Unauthorized(message),
        402 => PortalError::PaymentVerification {
            message,
            session_id: None,
        },
        404 => PortalError::NotFound(message),
        409 => PortalError::Conflict(message),
        400..=499 => PortalError::Validation(message),
        _ => PortalError::Server(message),
    }
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn call(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<Value, PortalError> {
        let epoch = self.session.epoch();
        let request = HttpRequest {
            method,
            path: path.to_string(),
            query,
            body,
            bearer: self.session.bearer_token(),
        };
        let method = request.method.clone();

        let result = self.transport.send(request).await;

        if self.session.epoch() != epoch {
            debug!(method = %method, path = %path, "Session changed during call; response dropped");
            return Err(PortalError::Stale);
        }

        let response = result?;
        if (200..300).contains(&response.status) {
            return Ok(response.body);
        }

        let err = error_for_status(response.status, &response.body);
        if matches!(err, PortalError::Unauthorized(_)) {
            warn!(status = response.status, path = %path, "Credentials refused; ending session");
            self.session.invalidate();
        } else {
            debug!(status = response.status, path = %path, error = %err, "Call rejected");
        }
        Err(err)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, PortalError> {
        let body = self.call(Method::GET, path, query, None).await?;
        decode(body)
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, PortalError> {
        let body = self.call(method, path, Vec::new(), body).await?;
        decode(body)
    }
}

pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T, PortalError> {
    serde_json::from_value(body).map_err(|e| PortalError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_message_preferred() {
        let err = error_for_status(409, &json!({"message": "Request is already done", "code": "CONFLICT"}));
        assert_eq!(err, PortalError::Conflict("Request is already done".into()));
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(
            error_for_status(500, &Value::Null),
            PortalError::Server(GENERIC_MESSAGE.into())
        );
        assert_eq!(
            error_for_status(404, &json!({"message": "   "})),
            PortalError::NotFound(GENERIC_MESSAGE.into())
        );
        assert_eq!(
            error_for_status(502, &Value::String("<html>Bad gateway</html>".into())),
            PortalError::Server(GENERIC_MESSAGE.into())
        );
    }

    #[test]
    fn test_status_classes() {
        assert!(matches!(error_for_status(403, &Value::Null), PortalError::Unauthorized(_)));
        assert!(matches!(
            error_for_status(402, &Value::Null),
            PortalError::PaymentVerification { session_id: None, .. }
        ));
        assert!(matches!(error_for_status(400, &Value::Null), PortalError::Validation(_)));
    }
}

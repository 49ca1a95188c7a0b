// Shared fixtures for module tests

use async_trait::async_trait;
use donation_domain::{AccountStatus, CheckoutRedirect, CheckoutSession, Role};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::auth::models::Claims;
use crate::auth::AuthedUser;
use crate::common::dev_mode::DevModeConfig;
use crate::common::{generate_user_id, AppConfig, AppState};
use crate::services::{CheckoutOrder, CheckoutProvider, PaymentError, RetrievedSession};

pub const TEST_SECRET: &str = "test_secret_key";
pub const BOOTSTRAP_ADMIN: &str = "root@example.com";

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    super::migrations::run_migrations(&pool, false).await.unwrap();
    pool
}

pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("JWT_SECRET", TEST_SECRET),
        ("ADMIN_EMAILS", BOOTSTRAP_ADMIN),
        ("CLIENT_URL", "http://portal.test"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
}

pub fn test_state(db: SqlitePool, checkout: Arc<dyn CheckoutProvider>) -> Arc<RwLock<AppState>> {
    Arc::new(RwLock::new(AppState {
        db,
        config: Arc::new(test_config()),
        dev_mode: DevModeConfig::disabled(),
        checkout,
    }))
}

pub fn provider_id_for(email: &str) -> String {
    format!("provider|{}", email.to_lowercase())
}

pub async fn seed_user(db: &SqlitePool, email: &str, role: Role, status: AccountStatus) -> AuthedUser {
    let id = generate_user_id();
    let name = email.split('@').next().unwrap_or("user").to_string();
    sqlx::query(
        "INSERT INTO users (id, provider_id, email, name, role, status) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(provider_id_for(email))
    .bind(email)
    .bind(&name)
    .bind(role.as_str())
    .bind(status.as_str())
    .execute(db)
    .await
    .unwrap();

    AuthedUser {
        id,
        email: email.to_string(),
        name: Some(name),
        role,
        status,
    }
}

pub fn token_for(provider_id: &str, email: Option<&str>) -> String {
    let claims = Claims {
        sub: provider_id.to_string(),
        email: email.map(str::to_string),
        name: None,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// In-memory checkout provider.
///
/// Sessions start unpaid; tests settle them with [`FakeCheckout::pay`].
#[derive(Default)]
pub struct FakeCheckout {
    sessions: Mutex<HashMap<String, RetrievedSession>>,
    next_id: AtomicUsize,
    retrievals: AtomicUsize,
    pub fail_create: AtomicBool,
    pub omit_url: AtomicBool,
}

impl FakeCheckout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, session_id: &str, session: CheckoutSession, donor_name: Option<&str>) {
        self.sessions.lock().unwrap().insert(
            session_id.to_string(),
            RetrievedSession {
                session,
                donor_name: donor_name.map(str::to_string),
            },
        );
    }

    /// A paid session for `email`.
    pub fn insert_paid(&self, session_id: &str, email: &str, amount_total: i64) {
        self.insert(
            session_id,
            CheckoutSession {
                id: Some(session_id.to_string()),
                payment_status: "paid".to_string(),
                amount_total: Some(amount_total),
                currency: Some("usd".to_string()),
                customer_email: Some(email.to_string()),
                payment_intent: Some(format!("pi_{}", session_id)),
            },
            Some("Test Donor"),
        );
    }

    pub fn pay(&self, session_id: &str) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(session_id) {
            entry.session.payment_status = "paid".to_string();
        }
    }

    pub fn session(&self, session_id: &str) -> Option<CheckoutSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.session.clone())
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn create_session(&self, order: &CheckoutOrder) -> Result<CheckoutRedirect, PaymentError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::RequestFailed("HTTP 500: provider down".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_test_{}", n);
        self.insert(
            &session_id,
            CheckoutSession {
                id: Some(session_id.clone()),
                payment_status: "unpaid".to_string(),
                amount_total: Some(order.unit_amount()?),
                currency: Some(order.currency.clone()),
                customer_email: Some(order.request.email.clone()),
                payment_intent: None,
            },
            Some(&order.request.name),
        );

        if self.omit_url.load(Ordering::SeqCst) {
            return Err(PaymentError::InvalidResponse("no checkout url".into()));
        }
        Ok(CheckoutRedirect {
            url: format!("https://checkout.test/pay/{}", session_id),
            session_id: Some(session_id),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))
    }
}

/// Router over the test state, as `main` builds it.
pub fn test_app(state: Arc<RwLock<AppState>>) -> axum::Router {
    crate::build_router(state, &["http://portal.test".to_string()])
}

/// Sends one request through `app` and returns the status and JSON body.
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(axum::body::Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use paypal_withdrawals::api::{create_router, AppState};
use paypal_withdrawals::auth::{AdminKey, JwtVerifier};
use paypal_withdrawals::db::{
    MemoryWithdrawalStore, StoreError, Transition, Withdrawal, WithdrawalStatus, WithdrawalStore,
};
use paypal_withdrawals::payout::{GatewayError, PayoutGateway, PayoutReceipt, PayoutRequest};
use paypal_withdrawals::service::{WithdrawalPolicy, WithdrawalService};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// Scripted provider behaviour for `RecordingGateway`.
#[derive(Clone)]
pub enum Outcome {
    Paid { batch_id: String, item_id: Option<String> },
    Rejected(Value),
}

/// Fake provider that counts calls and can be slowed down to widen races.
pub struct RecordingGateway {
    calls: AtomicUsize,
    delay: Duration,
    outcome: Outcome,
    requests: Mutex<Vec<PayoutRequest>>,
}

impl RecordingGateway {
    pub fn paying(batch_id: &str, item_id: &str) -> Self {
        Self::new(Outcome::Paid {
            batch_id: batch_id.to_string(),
            item_id: Some(item_id.to_string()),
        })
    }

    pub fn rejecting(payload: Value) -> Self {
        Self::new(Outcome::Rejected(payload))
    }

    pub fn new(outcome: Outcome) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PayoutRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PayoutGateway for RecordingGateway {
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.outcome {
            Outcome::Paid { batch_id, item_id } => Ok(PayoutReceipt {
                payout_batch_id: batch_id.clone(),
                payout_item_id: item_id.clone(),
                raw: paypal_response(batch_id, item_id.as_deref()),
            }),
            Outcome::Rejected(payload) => Err(GatewayError::Rejected {
                status: 422,
                payload: payload.clone(),
            }),
        }
    }
}

pub fn paypal_response(batch_id: &str, item_id: Option<&str>) -> Value {
    match item_id {
        Some(item) => json!({
            "batch_header": { "payout_batch_id": batch_id, "batch_status": "SUCCESS" },
            "items": [{ "payout_item_id": item, "transaction_status": "SUCCESS" }]
        }),
        None => json!({
            "batch_header": { "payout_batch_id": batch_id, "batch_status": "PENDING" }
        }),
    }
}

/// Memory store whose transitions into one status always fail.
pub struct FlakyStore {
    pub inner: MemoryWithdrawalStore,
    fail_on: WithdrawalStatus,
}

impl FlakyStore {
    pub fn failing_on(status: WithdrawalStatus) -> Self {
        Self {
            inner: MemoryWithdrawalStore::new(),
            fail_on: status,
        }
    }
}

#[async_trait]
impl WithdrawalStore for FlakyStore {
    async fn create(&self, withdrawal: &Withdrawal) -> Result<Uuid, StoreError> {
        self.inner.create(withdrawal).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Withdrawal>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self, limit: i64) -> Result<Vec<Withdrawal>, StoreError> {
        self.inner.list(limit).await
    }

    async fn try_transition(
        &self,
        id: Uuid,
        expected: WithdrawalStatus,
        transition: &Transition,
    ) -> Result<bool, StoreError> {
        if transition.status == self.fail_on {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.try_transition(id, expected, transition).await
    }
}

pub fn test_policy() -> WithdrawalPolicy {
    WithdrawalPolicy {
        payout_timeout: Duration::from_secs(5),
        ..WithdrawalPolicy::default()
    }
}

pub fn create_test_service(
    store: Arc<dyn WithdrawalStore>,
    gateway: Arc<dyn PayoutGateway>,
) -> WithdrawalService {
    WithdrawalService::new(store, gateway, test_policy())
}

pub fn create_test_app(gateway: Arc<dyn PayoutGateway>) -> (Router, Arc<MemoryWithdrawalStore>) {
    let store = Arc::new(MemoryWithdrawalStore::new());
    let app = create_test_app_with_store(store.clone(), gateway);
    (app, store)
}

pub fn create_test_app_with_store(
    store: Arc<dyn WithdrawalStore>,
    gateway: Arc<dyn PayoutGateway>,
) -> Router {
    let state = Arc::new(AppState {
        service: create_test_service(store, gateway),
        verifier: Arc::new(JwtVerifier::new(TEST_JWT_SECRET)),
        admin_key: AdminKey::new(TEST_ADMIN_KEY),
    });

    create_router(state)
}

pub fn user_token(user_id: &str) -> String {
    encode(
        &Header::default(),
        &json!({ "id": user_id, "email": format!("{}@example.com", user_id) }),
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()))
    };
    (status, parsed)
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use super::models::ErrorResponse;
use crate::auth::AuthError;
use crate::service::WithdrawalError;

/// Error returned by every handler: a status code, a machine-readable kind
/// and a human-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "not found")
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "auth_error", e.to_string())
    }
}

impl From<WithdrawalError> for ApiError {
    fn from(e: WithdrawalError) -> Self {
        match e {
            WithdrawalError::Validation(message) => Self::validation(message),
            WithdrawalError::NotFound(_) => Self::not_found(),
            WithdrawalError::StateConflict { status, .. } => {
                Self::new(StatusCode::BAD_REQUEST, "state_conflict", "not pending")
                    .with_details(json!({ "status": status }))
            }
            WithdrawalError::Gateway(err) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "gateway_error", "payout_failed")
                    .with_details(err.diagnostic())
            }
            WithdrawalError::Persistence(err) => {
                error!(error = %err, "persistence failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", "db error")
            }
            WithdrawalError::PayoutUnrecorded { id, receipt, .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "reconciliation_required",
                "payout sent but the withdrawal could not be updated",
            )
            .with_details(json!({
                "withdrawal_id": id,
                "payout_batch_id": receipt.payout_batch_id,
                "payout_item_id": receipt.payout_item_id,
            })),
            WithdrawalError::Aborted { id, reason } => {
                error!(withdrawal_id = %id, reason = %reason, "payout task aborted");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "reconciliation_required",
                    "payout outcome unknown; withdrawal left processing",
                )
                .with_details(json!({ "withdrawal_id": id }))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.kind,
            message: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{StoreError, WithdrawalStatus};
    use crate::payout::PayoutReceipt;
    use uuid::Uuid;

    #[test]
    fn aborted_payout_needs_reconciliation() {
        let id = Uuid::new_v4();
        let err = ApiError::from(WithdrawalError::Aborted {
            id,
            reason: "task panicked".to_string(),
        });

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, "reconciliation_required");
        assert_eq!(err.details, Some(json!({ "withdrawal_id": id })));
    }

    #[test]
    fn unrecorded_payout_exposes_provider_ids() {
        let id = Uuid::new_v4();
        let err = ApiError::from(WithdrawalError::PayoutUnrecorded {
            id,
            receipt: PayoutReceipt {
                payout_batch_id: "B1".to_string(),
                payout_item_id: Some("I1".to_string()),
                raw: json!({}),
            },
            source: StoreError::Corrupt("gone".to_string()),
        });

        assert_eq!(err.kind, "reconciliation_required");
        let details = err.details.unwrap();
        assert_eq!(details["payout_batch_id"], "B1");
        assert_eq!(details["payout_item_id"], "I1");
    }

    #[test]
    fn persistence_errors_hide_internals() {
        let err = ApiError::from(WithdrawalError::Persistence(StoreError::Corrupt(
            "unknown status `x`".to_string(),
        )));
        assert_eq!(err.kind, "persistence_error");
        assert_eq!(err.message, "db error");
        assert!(err.details.is_none());

        let err = ApiError::from(WithdrawalError::StateConflict {
            id: Uuid::new_v4(),
            status: WithdrawalStatus::Failed,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details, Some(json!({ "status": "failed" })));
    }
}

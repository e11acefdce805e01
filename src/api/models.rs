use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::WithdrawalStatus;

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub paypal_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub id: Uuid,
    pub status: WithdrawalStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub ok: bool,
    pub payout: Value,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

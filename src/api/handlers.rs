use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use super::models::{
    ApproveResponse, ListQuery, OkResponse, RejectRequest, WithdrawRequest, WithdrawResponse,
};
use super::routes::AppState;
use crate::auth::{bearer_token, Identity};
use crate::db::Withdrawal;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Caller authenticated by bearer token.
pub struct AuthUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = bearer_token(header)?;
        let identity = state.verifier.verify(token)?;
        Ok(AuthUser(identity))
    }
}

/// Request carrying a valid admin key header.
pub struct AdminGuard;

impl FromRequestParts<Arc<AppState>> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let presented = parts.headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
        state.admin_key.check(presented)?;
        Ok(AdminGuard)
    }
}

pub async fn handle_health() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

pub async fn handle_withdraw_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    let (amount, paypal_email) = match (payload.amount, payload.paypal_email.as_deref()) {
        (Some(amount), Some(email)) if !email.trim().is_empty() => (amount, email),
        _ => return Err(ApiError::validation("amount and paypal_email required")),
    };

    let withdrawal = state
        .service
        .submit(&user.id, amount, payload.currency.as_deref(), paypal_email)
        .await?;

    Ok(Json(WithdrawResponse {
        id: withdrawal.id,
        status: withdrawal.status,
    }))
}

pub async fn handle_admin_list(
    _admin: AdminGuard,
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let withdrawals = state.service.list(query.limit).await?;
    Ok(Json(withdrawals))
}

pub async fn handle_admin_approve(
    _admin: AdminGuard,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.service.approve(id).await?;
    Ok(Json(ApproveResponse {
        ok: true,
        payout: outcome.payout,
    }))
}

pub async fn handle_admin_reject(
    _admin: AdminGuard,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<OkResponse>, ApiError> {
    let id = parse_id(&id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RejectRequest::default()
    } else {
        serde_json::from_slice::<RejectRequest>(&body)
            .map_err(|e| ApiError::validation(format!("invalid body: {}", e)))?
    };

    state.service.reject(id, request.reason).await?;
    Ok(Json(OkResponse { ok: true }))
}

// Ids are opaque to callers; anything that is not one of ours is unknown.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found())
}

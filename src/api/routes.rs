use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    handle_admin_approve, handle_admin_list, handle_admin_reject, handle_health, handle_withdraw_post,
};
use crate::auth::{AdminKey, IdentityVerifier};
use crate::service::WithdrawalService;

pub struct AppState {
    pub service: WithdrawalService,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub admin_key: AdminKey,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/withdraw", post(handle_withdraw_post))
        .route("/admin/list", get(handle_admin_list))
        .route("/admin/approve/{id}", post(handle_admin_approve))
        .route("/admin/reject/{id}", post(handle_admin_reject))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

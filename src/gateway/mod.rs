//! HTTP gateway
//!
//! Thin axum surface over [`crate::engine::DealService`].

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::engine::DealService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DealService>,
}

/// Build the API router. All negotiation routes live under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/transactions",
            post(handlers::create_transaction).get(handlers::list_transactions),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::get_transaction).patch(handlers::update_transaction),
        )
        .route("/api/v1/offers", post(handlers::create_offer))
        .route("/api/v1/offers/{id}/respond", post(handlers::respond_offer))
        .route(
            "/api/v1/milestones/{id}/complete",
            post(handlers::complete_milestone),
        )
        .with_state(state)
}

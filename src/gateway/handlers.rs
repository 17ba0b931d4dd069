//! HTTP handlers for the negotiation API
//!
//! Handlers stay thin: extract the actor, decode the payload, call the
//! engine, wrap the result. All authorization happens in the engine.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::engine::{
    CounterOffer, CreateOffer, CreateTransaction, MilestoneId, MilestoneRecord, OfferDecision,
    OfferId, OfferOutcome, OfferRecord, Page, TransactionFilter, TransactionId, TransactionPatch,
    TransactionRecord, TransactionStatus, TransactionView, UserId,
};

use super::types::{ok, ApiError, ApiResult};
use super::AppState;

/// Caller identity; the upstream auth proxy injects this header.
const ACTOR_HEADER: &str = "x-actor-id";

fn actor_from(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<UserId>().ok())
        .ok_or_else(|| ApiError::unauthorized(format!("missing or invalid {} header", ACTOR_HEADER)))
}

pub async fn health() -> ApiResult<serde_json::Value> {
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
    }))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTransaction>,
) -> ApiResult<TransactionRecord> {
    let actor = actor_from(&headers)?;
    let transaction = state.service.create_transaction(req, actor).await?;
    ok(transaction)
}

pub async fn get_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(transaction_id): Path<TransactionId>,
) -> ApiResult<TransactionView> {
    let actor = actor_from(&headers)?;
    let view = state.service.get_transaction(transaction_id, actor).await?;
    ok(view)
}

pub async fn update_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(transaction_id): Path<TransactionId>,
    Json(patch): Json<TransactionPatch>,
) -> ApiResult<TransactionRecord> {
    let actor = actor_from(&headers)?;
    let transaction = state
        .service
        .update_transaction(transaction_id, patch, actor)
        .await?;
    ok(transaction)
}

/// Query-string shape for listing; `statuses` is comma-separated
/// because the query layer cannot decode repeated keys into a Vec.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    #[serde(default)]
    pub statuses: Option<String>,
    #[serde(default)]
    pub deal_type: Option<crate::engine::DealType>,
    #[serde(default)]
    pub property_id: Option<crate::engine::PropertyId>,
    #[serde(default)]
    pub buyer_id: Option<UserId>,
    #[serde(default)]
    pub seller_id: Option<UserId>,
    #[serde(default)]
    pub agent_id: Option<UserId>,
    #[serde(default)]
    pub created_from: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub created_to: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl ListTransactionsQuery {
    fn into_filter(self) -> Result<TransactionFilter, ApiError> {
        let mut statuses = Vec::new();
        if let Some(raw) = &self.statuses {
            for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let status: TransactionStatus =
                    serde_json::from_value(serde_json::Value::String(token.to_string()))
                        .map_err(|_| {
                            ApiError::bad_request(format!("unknown status: {}", token))
                        })?;
                statuses.push(status);
            }
        }
        Ok(TransactionFilter {
            statuses,
            deal_type: self.deal_type,
            property_id: self.property_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            agent_id: self.agent_id,
            created_from: self.created_from,
            created_to: self.created_to,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Page<TransactionRecord>> {
    let actor = actor_from(&headers)?;
    let filter = query.into_filter()?;
    let page = state.service.list_transactions(filter, actor).await?;
    ok(page)
}

pub async fn create_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateOffer>,
) -> ApiResult<OfferRecord> {
    let actor = actor_from(&headers)?;
    let offer = state.service.create_offer(req, actor).await?;
    ok(offer)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Accept,
    Reject,
    Counter,
}

#[derive(Debug, Deserialize)]
pub struct RespondOfferRequest {
    pub decision: DecisionKind,
    /// Required when `decision` is COUNTER
    #[serde(default)]
    pub counter: Option<CounterOffer>,
}

impl RespondOfferRequest {
    fn into_decision(self) -> Result<OfferDecision, ApiError> {
        match self.decision {
            DecisionKind::Accept => Ok(OfferDecision::Accept),
            DecisionKind::Reject => Ok(OfferDecision::Reject),
            DecisionKind::Counter => self
                .counter
                .map(OfferDecision::Counter)
                .ok_or_else(|| ApiError::bad_request("COUNTER decision requires a counter payload")),
        }
    }
}

pub async fn respond_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(offer_id): Path<OfferId>,
    Json(req): Json<RespondOfferRequest>,
) -> ApiResult<OfferOutcome> {
    let actor = actor_from(&headers)?;
    let decision = req.into_decision()?;
    let outcome = state.service.respond_to_offer(offer_id, decision, actor).await?;
    ok(outcome)
}

pub async fn complete_milestone(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(milestone_id): Path<MilestoneId>,
) -> ApiResult<MilestoneRecord> {
    let actor = actor_from(&headers)?;
    let milestone = state.service.complete_milestone(milestone_id, actor).await?;
    ok(milestone)
}

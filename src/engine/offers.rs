//! Offer Negotiation Engine
//!
//! Offer creation and the accept/reject/counter response branches.
//! Each branch is one unit of work: the offer-state update and any
//! derived transaction writes succeed or fail together.
//!
//! There is no automatic selection among concurrently pending offers;
//! responding to one offer never implicitly rejects its siblings.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use super::error::EngineError;
use super::service::DealService;
use super::state::{OfferStatus, TransactionStatus};
use super::store::{AcceptanceWrite, OfferSideEffects};
use super::types::{
    CreateOffer, HistoryId, OfferDecision, OfferId, OfferOutcome, OfferRecord,
    StatusHistoryRecord, UserId,
};

impl DealService {
    /// Submit a new offer on a transaction.
    ///
    /// Offers are accepted while the transaction is DRAFT or PENDING;
    /// the first offer on a DRAFT transaction promotes it to PENDING
    /// in the same unit of work, logged in the status history.
    ///
    /// The buyer seat stays open until an offer names a buyer: while
    /// `buyer_id` is unset, an actor from outside the declared parties
    /// may offer and is recorded as the transaction's buyer in the
    /// same unit of work. Once a buyer is named, outsiders get
    /// `UNAUTHORIZED` like everywhere else.
    pub async fn create_offer(
        &self,
        data: CreateOffer,
        actor: UserId,
    ) -> Result<OfferRecord, EngineError> {
        let (transaction, property) = self.resolve_transaction(data.transaction_id).await?;

        let is_party = super::auth::is_participant(&transaction, property.owner_id, actor);
        if !is_party && transaction.buyer_id.is_some() {
            return Err(EngineError::Unauthorized);
        }

        if data.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount);
        }
        if !matches!(
            transaction.status,
            TransactionStatus::Draft | TransactionStatus::Pending
        ) {
            return Err(EngineError::TransactionClosed(
                transaction.transaction_id.to_string(),
            ));
        }

        let now = Utc::now();
        let offer = OfferRecord {
            offer_id: OfferId::new(),
            transaction_id: transaction.transaction_id,
            offerer_id: actor,
            amount: data.amount,
            currency: data.currency.unwrap_or_else(|| transaction.currency.clone()),
            message: data.message,
            conditions: data.conditions,
            valid_until: data.valid_until,
            status: OfferStatus::Pending,
            parent_offer_id: None,
            responded_at: None,
            created_at: now,
        };

        // Single automatic transition in the whole lifecycle.
        let promotion = (transaction.status == TransactionStatus::Draft).then(|| {
            StatusHistoryRecord {
                history_id: HistoryId::new(),
                transaction_id: transaction.transaction_id,
                previous_status: TransactionStatus::Draft,
                new_status: TransactionStatus::Pending,
                changed_by: actor,
                reason: Some("offer created".to_string()),
                created_at: now,
            }
        });
        let buyer_claim = (!is_party).then_some(actor);

        let side = (promotion.is_some() || buyer_claim.is_some()).then(|| OfferSideEffects {
            expected_version: transaction.version,
            buyer_id: buyer_claim,
            promotion,
        });

        let created = self.store().insert_offer(offer, side).await?;

        info!(
            offer_id = %created.offer_id,
            transaction_id = %created.transaction_id,
            offerer = actor,
            amount = %created.amount,
            "Offer created"
        );

        self.invalidate_cache(created.transaction_id).await;
        Ok(created)
    }

    /// Resolve a pending offer.
    ///
    /// - Accept: the transaction moves to ACCEPTED, `final_amount`
    ///   takes the offer amount and `accepted_date` is stamped, all in
    ///   the same unit of work.
    /// - Counter: a new PENDING offer is created with
    ///   `parent_offer_id` pointing at the original; the transaction
    ///   status is untouched.
    /// - Reject: only the offer changes; any transaction-level
    ///   rejection is a separate, caller-driven update.
    pub async fn respond_to_offer(
        &self,
        offer_id: OfferId,
        decision: OfferDecision,
        actor: UserId,
    ) -> Result<OfferOutcome, EngineError> {
        let offer = self
            .store()
            .fetch_offer(offer_id)
            .await?
            .ok_or_else(|| EngineError::OfferNotFound(offer_id.to_string()))?;

        let (transaction, _property) = self
            .guarded_transaction(offer.transaction_id, actor)
            .await?;

        if offer.status.is_resolved() {
            return Err(EngineError::OfferAlreadyResolved(offer_id.to_string()));
        }

        let now = Utc::now();
        // Expired offers can still be rejected for bookkeeping, but
        // not accepted or countered.
        let expired = offer.valid_until.is_some_and(|v| v < now);
        if expired && !matches!(decision, OfferDecision::Reject) {
            return Err(EngineError::OfferExpired(offer_id.to_string()));
        }

        let new_status = decision.resolved_status();
        let mut counter = None;
        let mut acceptance = None;

        match decision {
            OfferDecision::Accept => {
                if !transaction
                    .status
                    .can_transition(TransactionStatus::Accepted)
                {
                    return Err(EngineError::InvalidTransition {
                        from: transaction.status,
                        to: TransactionStatus::Accepted,
                    });
                }
                acceptance = Some(AcceptanceWrite {
                    transaction_id: transaction.transaction_id,
                    expected_version: transaction.version,
                    final_amount: offer.amount,
                    accepted_date: now,
                    history: StatusHistoryRecord {
                        history_id: HistoryId::new(),
                        transaction_id: transaction.transaction_id,
                        previous_status: transaction.status,
                        new_status: TransactionStatus::Accepted,
                        changed_by: actor,
                        reason: Some("offer accepted".to_string()),
                        created_at: now,
                    },
                });
            }
            OfferDecision::Counter(data) => {
                if data.amount <= Decimal::ZERO {
                    return Err(EngineError::InvalidAmount);
                }
                counter = Some(OfferRecord {
                    offer_id: OfferId::new(),
                    transaction_id: offer.transaction_id,
                    offerer_id: actor,
                    amount: data.amount,
                    currency: offer.currency.clone(),
                    message: data.message,
                    conditions: data.conditions,
                    valid_until: data.valid_until,
                    status: OfferStatus::Pending,
                    parent_offer_id: Some(offer_id),
                    responded_at: None,
                    created_at: now,
                });
            }
            OfferDecision::Reject => {}
        }

        let outcome = self
            .store()
            .respond_offer(offer_id, new_status, now, counter, acceptance)
            .await?;

        info!(
            offer_id = %offer_id,
            transaction_id = %offer.transaction_id,
            resolution = %new_status,
            actor = actor,
            "Offer resolved"
        );

        self.invalidate_cache(offer.transaction_id).await;
        Ok(outcome)
    }
}

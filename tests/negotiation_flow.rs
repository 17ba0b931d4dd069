//! End-to-end negotiation scenarios over the in-memory store.
//!
//! These exercise the full service surface: transaction creation with
//! its checklist and history anchor, draft promotion, offer
//! accept/reject/counter, milestone completion and the property-status
//! sync on completion.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use dealdesk::engine::{
    CounterOffer, CreateOffer, CreateTransaction, DealService, DealStore, DealType, EngineError,
    MemoryStore, NoopCache, OfferDecision, OfferStatus, PropertyId, PropertyRecord, PropertyStatus,
    TransactionFilter, TransactionPatch, TransactionStatus, UserId,
};

const OWNER: UserId = 10;
const SELLER: UserId = 10; // owner sells their own property
const BUYER: UserId = 20;
const AGENT: UserId = 30;
const STRANGER: UserId = 99;

struct Harness {
    service: DealService,
    store: Arc<MemoryStore>,
    property_id: PropertyId,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let property_id = PropertyId::new();
    store
        .upsert_property(PropertyRecord {
            property_id,
            owner_id: OWNER,
            status: PropertyStatus::Available,
        })
        .await;
    let service = DealService::new(store.clone(), Arc::new(NoopCache));
    Harness {
        service,
        store,
        property_id,
    }
}

fn create_request(property_id: PropertyId, deal_type: DealType) -> CreateTransaction {
    CreateTransaction {
        property_id,
        seller_id: SELLER,
        buyer_id: Some(BUYER),
        agent_id: Some(AGENT),
        deal_type,
        offer_amount: None,
        currency: "USD".to_string(),
        terms: None,
        expected_completion: None,
    }
}

fn offer_request(
    transaction_id: dealdesk::engine::TransactionId,
    amount: i64,
) -> CreateOffer {
    CreateOffer {
        transaction_id,
        amount: Decimal::from(amount),
        currency: None,
        message: None,
        conditions: None,
        valid_until: None,
    }
}

#[tokio::test]
async fn create_transaction_initializes_checklist_and_history() {
    let h = harness().await;

    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Draft);
    assert_eq!(tx.version, 1);
    assert!(tx.final_amount.is_none());
    assert!(tx.accepted_date.is_none());

    let view = h
        .service
        .get_transaction(tx.transaction_id, SELLER)
        .await
        .unwrap();
    assert_eq!(view.milestones.len(), 7);
    let sequences: Vec<i16> = view.milestones.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6, 7]);

    // One anchor history row is written atomically with creation.
    assert_eq!(h.store.history_len(tx.transaction_id).await, 1);
    let anchor = &view.history[0];
    assert_eq!(anchor.previous_status, TransactionStatus::Draft);
    assert_eq!(anchor.new_status, TransactionStatus::Draft);
    assert_eq!(anchor.reason.as_deref(), Some("created"));
}

#[tokio::test]
async fn lease_transaction_gets_lease_checklist() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Lease), SELLER)
        .await
        .unwrap();

    let view = h
        .service
        .get_transaction(tx.transaction_id, SELLER)
        .await
        .unwrap();
    assert_eq!(view.milestones.len(), 6);
    assert!(view.milestones.iter().any(|m| m.title == "Lease Agreement"));
    assert!(view.milestones.iter().all(|m| m.is_required));
}

#[tokio::test]
async fn create_transaction_fails_for_unknown_property_and_stranger() {
    let h = harness().await;

    let missing = h
        .service
        .create_transaction(create_request(PropertyId::new(), DealType::Purchase), SELLER)
        .await;
    assert!(matches!(missing, Err(EngineError::PropertyNotFound(_))));

    let unauthorized = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), STRANGER)
        .await;
    assert!(matches!(unauthorized, Err(EngineError::Unauthorized)));
}

#[tokio::test]
async fn first_offer_promotes_draft_exactly_once() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    let first = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    assert_eq!(first.status, OfferStatus::Pending);
    assert!(first.parent_offer_id.is_none());

    let after_first = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_first.status, TransactionStatus::Pending);
    // anchor + promotion
    assert_eq!(h.store.history_len(tx.transaction_id).await, 2);

    // A second offer does not write another promotion row.
    h.service
        .create_offer(offer_request(tx.transaction_id, 260_000), BUYER)
        .await
        .unwrap();
    let after_second = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_second.status, TransactionStatus::Pending);
    assert_eq!(h.store.history_len(tx.transaction_id).await, 2);
}

#[tokio::test]
async fn offer_amount_must_be_positive() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    let zero = h
        .service
        .create_offer(offer_request(tx.transaction_id, 0), BUYER)
        .await;
    assert!(matches!(zero, Err(EngineError::InvalidAmount)));

    // The failed call left the transaction in DRAFT.
    let current = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, TransactionStatus::Draft);
}

#[tokio::test]
async fn accepting_an_offer_stamps_the_transaction() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();

    let outcome = h
        .service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();
    assert_eq!(outcome.offer.status, OfferStatus::Accepted);
    assert!(outcome.offer.responded_at.is_some());
    assert!(outcome.counter_offer.is_none());

    let accepted = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.status, TransactionStatus::Accepted);
    assert_eq!(accepted.final_amount, Some(Decimal::from(250_000)));
    assert!(accepted.accepted_date.is_some());
    // anchor + promotion + acceptance
    assert_eq!(h.store.history_len(tx.transaction_id).await, 3);

    // The resolved offer cannot be responded to again.
    let again = h
        .service
        .respond_to_offer(offer.offer_id, OfferDecision::Reject, SELLER)
        .await;
    assert!(matches!(again, Err(EngineError::OfferAlreadyResolved(_))));
}

#[tokio::test]
async fn counter_offer_creates_a_linked_pending_offer() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();

    let outcome = h
        .service
        .respond_to_offer(
            offer.offer_id,
            OfferDecision::Counter(CounterOffer {
                amount: Decimal::from(270_000),
                message: Some("closer to asking".to_string()),
                conditions: None,
                valid_until: None,
            }),
            SELLER,
        )
        .await
        .unwrap();

    assert_eq!(outcome.offer.status, OfferStatus::Countered);
    let counter = outcome.counter_offer.unwrap();
    assert_eq!(counter.status, OfferStatus::Pending);
    assert_eq!(counter.parent_offer_id, Some(offer.offer_id));
    assert_eq!(counter.offerer_id, SELLER);
    assert_eq!(counter.currency, offer.currency);

    // Countering never touches the transaction state.
    let current = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, TransactionStatus::Pending);

    // The buyer can accept the counter to close the loop.
    h.service
        .respond_to_offer(counter.offer_id, OfferDecision::Accept, BUYER)
        .await
        .unwrap();
    let accepted = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.status, TransactionStatus::Accepted);
    assert_eq!(accepted.final_amount, Some(Decimal::from(270_000)));
}

#[tokio::test]
async fn expired_offers_can_be_rejected_but_not_accepted() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    let mut req = offer_request(tx.transaction_id, 250_000);
    req.valid_until = Some(Utc::now() - Duration::hours(1));
    let offer = h.service.create_offer(req, BUYER).await.unwrap();

    let accept = h
        .service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await;
    assert!(matches!(accept, Err(EngineError::OfferExpired(_))));

    let counter = h
        .service
        .respond_to_offer(
            offer.offer_id,
            OfferDecision::Counter(CounterOffer {
                amount: Decimal::from(260_000),
                message: None,
                conditions: None,
                valid_until: None,
            }),
            SELLER,
        )
        .await;
    assert!(matches!(counter, Err(EngineError::OfferExpired(_))));

    let reject = h
        .service
        .respond_to_offer(offer.offer_id, OfferDecision::Reject, SELLER)
        .await
        .unwrap();
    assert_eq!(reject.offer.status, OfferStatus::Rejected);
}

#[tokio::test]
async fn offers_are_refused_once_the_transaction_closes() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    h.service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();

    let late = h
        .service
        .create_offer(offer_request(tx.transaction_id, 240_000), BUYER)
        .await;
    assert!(matches!(late, Err(EngineError::TransactionClosed(_))));
}

#[tokio::test]
async fn only_parties_can_see_or_act_on_a_transaction() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    let read = h.service.get_transaction(tx.transaction_id, STRANGER).await;
    assert!(matches!(read, Err(EngineError::Unauthorized)));

    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), STRANGER)
        .await;
    assert!(matches!(offer, Err(EngineError::Unauthorized)));

    let patch = h
        .service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Cancelled),
                ..Default::default()
            },
            STRANGER,
        )
        .await;
    assert!(matches!(patch, Err(EngineError::Unauthorized)));

    // The agent is a party and can read.
    assert!(h
        .service
        .get_transaction(tx.transaction_id, AGENT)
        .await
        .is_ok());
}

#[tokio::test]
async fn first_offer_from_an_undeclared_buyer_claims_the_seat() {
    let h = harness().await;
    let mut req = create_request(h.property_id, DealType::Purchase);
    req.buyer_id = None;
    let tx = h.service.create_transaction(req, SELLER).await.unwrap();
    assert!(tx.buyer_id.is_none());

    // Nobody named a buyer, so an outside offerer takes the seat.
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    assert_eq!(offer.offerer_id, BUYER);

    let current = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.buyer_id, Some(BUYER));
    assert_eq!(current.status, TransactionStatus::Pending);

    // Now a party: reads work, and the negotiation proceeds normally.
    assert!(h
        .service
        .get_transaction(tx.transaction_id, BUYER)
        .await
        .is_ok());

    // The seat is taken; the next outsider is refused.
    let late = h
        .service
        .create_offer(offer_request(tx.transaction_id, 240_000), STRANGER)
        .await;
    assert!(matches!(late, Err(EngineError::Unauthorized)));

    h.service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();
    let accepted = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.final_amount, Some(Decimal::from(250_000)));
}

#[tokio::test]
async fn offers_from_declared_parties_leave_the_buyer_seat_open() {
    let h = harness().await;
    let mut req = create_request(h.property_id, DealType::Purchase);
    req.buyer_id = None;
    let tx = h.service.create_transaction(req, SELLER).await.unwrap();

    // An agent's opening offer must not record the agent as buyer.
    h.service
        .create_offer(offer_request(tx.transaction_id, 245_000), AGENT)
        .await
        .unwrap();
    let current = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert!(current.buyer_id.is_none());
    assert_eq!(current.status, TransactionStatus::Pending);

    // The seat is still open for a real buyer.
    h.service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    let named = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(named.buyer_id, Some(BUYER));
}

#[tokio::test]
async fn status_transitions_are_validated() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();

    // DRAFT cannot jump straight to COMPLETED.
    let jump = h
        .service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Completed),
                ..Default::default()
            },
            SELLER,
        )
        .await;
    assert!(matches!(
        jump,
        Err(EngineError::InvalidTransition {
            from: TransactionStatus::Draft,
            to: TransactionStatus::Completed,
        })
    ));

    // Cancelling from DRAFT is allowed and recorded with the reason.
    let cancelled = h
        .service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Cancelled),
                status_reason: Some("seller withdrew".to_string()),
                ..Default::default()
            },
            SELLER,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);

    let view = h
        .service
        .get_transaction(tx.transaction_id, SELLER)
        .await
        .unwrap();
    assert_eq!(view.history[0].reason.as_deref(), Some("seller withdrew"));

    // Terminal states accept no further transitions.
    let after_cancel = h
        .service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Pending),
                ..Default::default()
            },
            SELLER,
        )
        .await;
    assert!(matches!(
        after_cancel,
        Err(EngineError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn milestone_completion_is_one_way() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let view = h
        .service
        .get_transaction(tx.transaction_id, SELLER)
        .await
        .unwrap();
    let milestone_id = view.milestones[0].milestone_id;

    let by_stranger = h.service.complete_milestone(milestone_id, STRANGER).await;
    assert!(matches!(by_stranger, Err(EngineError::Unauthorized)));

    let completed = h
        .service
        .complete_milestone(milestone_id, AGENT)
        .await
        .unwrap();
    assert!(completed.is_completed());
    assert_eq!(completed.completed_by, Some(AGENT));

    let again = h.service.complete_milestone(milestone_id, SELLER).await;
    assert!(matches!(
        again,
        Err(EngineError::MilestoneAlreadyCompleted(_))
    ));

    // The original stamp survives.
    let current = h
        .store
        .fetch_milestone(milestone_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.completed_by, Some(AGENT));
}

#[tokio::test]
async fn completing_a_purchase_marks_the_property_sold() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    h.service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();

    let completed = h
        .service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Completed),
                status_reason: Some("closing done".to_string()),
                ..Default::default()
            },
            SELLER,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);

    let property = h
        .store
        .find_property(h.property_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(property.status, PropertyStatus::Sold);
    // anchor + promotion + acceptance + completion
    assert_eq!(h.store.history_len(tx.transaction_id).await, 4);
}

#[tokio::test]
async fn completing_a_lease_marks_the_property_rented() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Lease), SELLER)
        .await
        .unwrap();
    let offer = h
        .service
        .create_offer(offer_request(tx.transaction_id, 2_000), BUYER)
        .await
        .unwrap();
    h.service
        .respond_to_offer(offer.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();
    h.service
        .update_transaction(
            tx.transaction_id,
            TransactionPatch {
                status: Some(TransactionStatus::Completed),
                ..Default::default()
            },
            SELLER,
        )
        .await
        .unwrap();

    let property = h
        .store
        .find_property(h.property_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(property.status, PropertyStatus::Rented);
}

#[tokio::test]
async fn concurrent_accepts_lose_the_version_race() {
    let h = harness().await;
    let tx = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    let first = h
        .service
        .create_offer(offer_request(tx.transaction_id, 250_000), BUYER)
        .await
        .unwrap();
    let second = h
        .service
        .create_offer(offer_request(tx.transaction_id, 255_000), BUYER)
        .await
        .unwrap();

    h.service
        .respond_to_offer(first.offer_id, OfferDecision::Accept, SELLER)
        .await
        .unwrap();

    // The transaction already left PENDING, so the sibling cannot be
    // accepted on top of it.
    let losing = h
        .service
        .respond_to_offer(second.offer_id, OfferDecision::Accept, SELLER)
        .await;
    assert!(matches!(
        losing,
        Err(EngineError::InvalidTransition { .. })
    ));

    // Only the first offer's amount made it onto the transaction.
    let current = h
        .store
        .fetch_transaction(tx.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.final_amount, Some(Decimal::from(250_000)));
}

#[tokio::test]
async fn listing_is_scoped_to_the_actor() {
    let h = harness().await;
    let purchase = h
        .service
        .create_transaction(create_request(h.property_id, DealType::Purchase), SELLER)
        .await
        .unwrap();
    h.service
        .create_transaction(create_request(h.property_id, DealType::Lease), SELLER)
        .await
        .unwrap();

    let all = h
        .service
        .list_transactions(TransactionFilter::default(), SELLER)
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let none = h
        .service
        .list_transactions(TransactionFilter::default(), STRANGER)
        .await
        .unwrap();
    assert_eq!(none.total, 0);
    assert!(none.items.is_empty());

    let purchases = h
        .service
        .list_transactions(
            TransactionFilter {
                deal_type: Some(DealType::Purchase),
                ..Default::default()
            },
            BUYER,
        )
        .await
        .unwrap();
    assert_eq!(purchases.total, 1);
    assert_eq!(purchases.items[0].transaction_id, purchase.transaction_id);

    let drafts = h
        .service
        .list_transactions(
            TransactionFilter {
                statuses: vec![TransactionStatus::Draft],
                ..Default::default()
            },
            SELLER,
        )
        .await
        .unwrap();
    assert_eq!(drafts.total, 2);
}

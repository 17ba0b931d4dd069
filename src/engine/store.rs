//! Persistence Gateway Contract
//!
//! `DealStore` methods are the atomic units of work of the engine:
//! every method either commits all of its writes or none of them, so
//! partial writes (offer updated but no history row, status changed
//! but property not synced) are never observable.
//!
//! Implementations: `PgStore` (sqlx/Postgres, one SQL transaction per
//! call) and `MemoryStore` (single-mutex tables for dev and tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::EngineError;
use super::state::{OfferStatus, TransactionStatus};
use super::types::{
    MilestoneId, MilestoneRecord, OfferId, OfferOutcome, OfferRecord, Page, PropertyId,
    PropertyRecord, PropertyStatus, StatusHistoryRecord, TransactionFilter, TransactionId,
    TransactionRecord, TransactionView, UserId,
};

/// Field-level changes applied by `update_transaction`.
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    pub status: Option<TransactionStatus>,
    pub buyer_id: Option<UserId>,
    pub agent_id: Option<UserId>,
    pub offer_amount: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub accepted_date: Option<DateTime<Utc>>,
    pub terms: Option<serde_json::Value>,
    pub expected_completion: Option<DateTime<Utc>>,
}

/// Property-status write folded into a transaction update's unit of
/// work (COMPLETED sync: PURCHASE -> SOLD, LEASE -> RENTED).
#[derive(Debug, Clone, Copy)]
pub struct PropertySync {
    pub property_id: PropertyId,
    pub status: PropertyStatus,
}

/// Transaction-side writes folded into an offer insert: the first
/// offer promotes DRAFT to PENDING, and an offer from outside the
/// declared parties names the offerer as the transaction's buyer.
#[derive(Debug, Clone)]
pub struct OfferSideEffects {
    /// Version the caller read; the store CAS-checks it.
    pub expected_version: i64,
    /// Offerer recorded as the transaction's buyer.
    pub buyer_id: Option<UserId>,
    /// DRAFT -> PENDING promotion history row.
    pub promotion: Option<StatusHistoryRecord>,
}

/// Transaction-side writes of an offer acceptance.
#[derive(Debug, Clone)]
pub struct AcceptanceWrite {
    pub transaction_id: TransactionId,
    pub expected_version: i64,
    pub final_amount: Decimal,
    pub accepted_date: DateTime<Utc>,
    pub history: StatusHistoryRecord,
}

/// Transactional storage for transactions, offers, milestones and
/// status-history rows.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Read the owner/status slice of a property row.
    async fn find_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Option<PropertyRecord>, EngineError>;

    /// Insert a transaction together with its default milestone set
    /// and the DRAFT -> DRAFT anchor history row.
    async fn insert_transaction(
        &self,
        transaction: TransactionRecord,
        milestones: Vec<MilestoneRecord>,
        anchor: StatusHistoryRecord,
    ) -> Result<TransactionRecord, EngineError>;

    async fn fetch_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionRecord>, EngineError>;

    /// Hydrate a transaction with offers (newest first), milestones
    /// (by sequence) and history (newest first).
    async fn fetch_view(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionView>, EngineError>;

    /// List transactions where `actor` is buyer, seller, agent or
    /// property owner, narrowed by `filter`, newest first.
    async fn list_transactions(
        &self,
        actor: UserId,
        filter: &TransactionFilter,
    ) -> Result<Page<TransactionRecord>, EngineError>;

    /// Apply `changes` to a transaction, appending `history` and
    /// performing `property_sync` in the same unit of work.
    ///
    /// Compare-and-swaps on `expected_version`; fails with
    /// `VersionConflict` when the row moved underneath the caller.
    async fn update_transaction(
        &self,
        transaction_id: TransactionId,
        expected_version: i64,
        changes: TransactionChanges,
        history: Option<StatusHistoryRecord>,
        property_sync: Option<PropertySync>,
    ) -> Result<TransactionRecord, EngineError>;

    /// Insert an offer; `side` carries the transaction-side writes
    /// (draft promotion, buyer naming) applied in the same unit of
    /// work under a version CAS.
    async fn insert_offer(
        &self,
        offer: OfferRecord,
        side: Option<OfferSideEffects>,
    ) -> Result<OfferRecord, EngineError>;

    async fn fetch_offer(&self, offer_id: OfferId) -> Result<Option<OfferRecord>, EngineError>;

    /// Resolve a pending offer. All three branches are one unit of
    /// work:
    /// - accept: `acceptance` writes final amount, accepted date and
    ///   an ACCEPTED history row on the transaction;
    /// - counter: `counter` is inserted with PENDING status;
    /// - reject: only the offer row changes.
    ///
    /// The offer-row update is conditional on the row still being
    /// PENDING; a racer that lost fails with `OfferAlreadyResolved`
    /// and writes nothing.
    async fn respond_offer(
        &self,
        offer_id: OfferId,
        new_status: OfferStatus,
        responded_at: DateTime<Utc>,
        counter: Option<OfferRecord>,
        acceptance: Option<AcceptanceWrite>,
    ) -> Result<OfferOutcome, EngineError>;

    async fn fetch_milestone(
        &self,
        milestone_id: MilestoneId,
    ) -> Result<Option<MilestoneRecord>, EngineError>;

    /// Stamp `completed_at`/`completed_by`. Fails with
    /// `MilestoneAlreadyCompleted` if the stamp is already set - the
    /// write is conditional so concurrent completions cannot race.
    async fn complete_milestone(
        &self,
        milestone_id: MilestoneId,
        completed_by: UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<MilestoneRecord, EngineError>;
}

//! In-Memory Store
//!
//! Single-mutex implementation of the persistence gateway. Used by the
//! service binary when no `postgres_url` is configured, and by the
//! integration tests. Every trait method validates its preconditions
//! before touching any table, so a failing call leaves the store
//! unchanged - the same all-or-nothing contract `PgStore` gets from
//! SQL transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::error::EngineError;
use super::state::OfferStatus;
use super::store::{AcceptanceWrite, DealStore, OfferSideEffects, PropertySync, TransactionChanges};
use super::types::{
    MilestoneId, MilestoneRecord, OfferId, OfferOutcome, OfferRecord, Page, PropertyId,
    PropertyRecord, StatusHistoryRecord, TransactionFilter, TransactionId, TransactionRecord,
    TransactionView, UserId,
};

#[derive(Default)]
struct Tables {
    properties: HashMap<PropertyId, PropertyRecord>,
    transactions: HashMap<TransactionId, TransactionRecord>,
    offers: HashMap<OfferId, OfferRecord>,
    milestones: HashMap<MilestoneId, MilestoneRecord>,
    history: Vec<StatusHistoryRecord>,
}

/// In-memory deal store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a property row (dev mode and tests; property
    /// CRUD proper is an external collaborator).
    pub async fn upsert_property(&self, property: PropertyRecord) {
        let mut tables = self.tables.lock().await;
        tables.properties.insert(property.property_id, property);
    }

    /// Number of history rows for a transaction (test observability).
    pub async fn history_len(&self, transaction_id: TransactionId) -> usize {
        let tables = self.tables.lock().await;
        tables
            .history
            .iter()
            .filter(|h| h.transaction_id == transaction_id)
            .count()
    }
}

fn apply_changes(tx: &mut TransactionRecord, changes: TransactionChanges) {
    if let Some(status) = changes.status {
        tx.status = status;
    }
    if let Some(buyer) = changes.buyer_id {
        tx.buyer_id = Some(buyer);
    }
    if let Some(agent) = changes.agent_id {
        tx.agent_id = Some(agent);
    }
    if let Some(amount) = changes.offer_amount {
        tx.offer_amount = Some(amount);
    }
    if let Some(amount) = changes.final_amount {
        tx.final_amount = Some(amount);
    }
    if let Some(date) = changes.accepted_date {
        tx.accepted_date = Some(date);
    }
    if let Some(terms) = changes.terms {
        tx.terms = Some(terms);
    }
    if let Some(date) = changes.expected_completion {
        tx.expected_completion = Some(date);
    }
    tx.version += 1;
    tx.updated_at = Utc::now();
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn find_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Option<PropertyRecord>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(tables.properties.get(&property_id).cloned())
    }

    async fn insert_transaction(
        &self,
        transaction: TransactionRecord,
        milestones: Vec<MilestoneRecord>,
        anchor: StatusHistoryRecord,
    ) -> Result<TransactionRecord, EngineError> {
        let mut tables = self.tables.lock().await;
        for milestone in milestones {
            tables.milestones.insert(milestone.milestone_id, milestone);
        }
        tables.history.push(anchor);
        tables
            .transactions
            .insert(transaction.transaction_id, transaction.clone());
        Ok(transaction)
    }

    async fn fetch_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionRecord>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(tables.transactions.get(&transaction_id).cloned())
    }

    async fn fetch_view(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionView>, EngineError> {
        let tables = self.tables.lock().await;
        let Some(transaction) = tables.transactions.get(&transaction_id).cloned() else {
            return Ok(None);
        };

        let mut offers: Vec<OfferRecord> = tables
            .offers
            .values()
            .filter(|o| o.transaction_id == transaction_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut milestones: Vec<MilestoneRecord> = tables
            .milestones
            .values()
            .filter(|m| m.transaction_id == transaction_id)
            .cloned()
            .collect();
        milestones.sort_by_key(|m| m.sequence);

        let mut history: Vec<StatusHistoryRecord> = tables
            .history
            .iter()
            .filter(|h| h.transaction_id == transaction_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Some(TransactionView {
            transaction,
            offers,
            milestones,
            history,
        }))
    }

    async fn list_transactions(
        &self,
        actor: UserId,
        filter: &TransactionFilter,
    ) -> Result<Page<TransactionRecord>, EngineError> {
        let tables = self.tables.lock().await;

        let mut matches: Vec<TransactionRecord> = tables
            .transactions
            .values()
            .filter(|tx| {
                let owner = tables
                    .properties
                    .get(&tx.property_id)
                    .map(|p| p.owner_id);
                tx.buyer_id == Some(actor)
                    || tx.seller_id == actor
                    || tx.agent_id == Some(actor)
                    || owner == Some(actor)
            })
            .filter(|tx| filter.statuses.is_empty() || filter.statuses.contains(&tx.status))
            .filter(|tx| filter.deal_type.is_none_or(|t| tx.deal_type == t))
            .filter(|tx| filter.property_id.is_none_or(|p| tx.property_id == p))
            .filter(|tx| filter.buyer_id.is_none_or(|b| tx.buyer_id == Some(b)))
            .filter(|tx| filter.seller_id.is_none_or(|s| tx.seller_id == s))
            .filter(|tx| filter.agent_id.is_none_or(|a| tx.agent_id == Some(a)))
            .filter(|tx| filter.created_from.is_none_or(|f| tx.created_at >= f))
            .filter(|tx| filter.created_to.is_none_or(|t| tx.created_at <= t))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page() as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: filter.page(),
            per_page: filter.per_page(),
        })
    }

    async fn update_transaction(
        &self,
        transaction_id: TransactionId,
        expected_version: i64,
        changes: TransactionChanges,
        history: Option<StatusHistoryRecord>,
        property_sync: Option<PropertySync>,
    ) -> Result<TransactionRecord, EngineError> {
        let mut tables = self.tables.lock().await;

        // Validate everything before mutating anything: a failed call
        // must leave all tables untouched.
        {
            let tx = tables
                .transactions
                .get(&transaction_id)
                .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))?;
            if tx.version != expected_version {
                return Err(EngineError::VersionConflict);
            }
        }
        if let Some(sync) = &property_sync {
            if !tables.properties.contains_key(&sync.property_id) {
                return Err(EngineError::PropertyNotFound(sync.property_id.to_string()));
            }
        }

        if let Some(sync) = property_sync {
            if let Some(property) = tables.properties.get_mut(&sync.property_id) {
                property.status = sync.status;
            }
        }
        if let Some(entry) = history {
            tables.history.push(entry);
        }
        let tx = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))?;
        apply_changes(tx, changes);
        Ok(tx.clone())
    }

    async fn insert_offer(
        &self,
        offer: OfferRecord,
        side: Option<OfferSideEffects>,
    ) -> Result<OfferRecord, EngineError> {
        let mut tables = self.tables.lock().await;

        if let Some(side) = side {
            let tx = tables
                .transactions
                .get_mut(&offer.transaction_id)
                .ok_or_else(|| {
                    EngineError::TransactionNotFound(offer.transaction_id.to_string())
                })?;
            if tx.version != side.expected_version {
                return Err(EngineError::VersionConflict);
            }
            if let Some(buyer) = side.buyer_id {
                tx.buyer_id = Some(buyer);
            }
            if let Some(entry) = &side.promotion {
                tx.status = entry.new_status;
            }
            tx.version += 1;
            tx.updated_at = Utc::now();
            if let Some(entry) = side.promotion {
                tables.history.push(entry);
            }
        }

        tables.offers.insert(offer.offer_id, offer.clone());
        Ok(offer)
    }

    async fn fetch_offer(&self, offer_id: OfferId) -> Result<Option<OfferRecord>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(tables.offers.get(&offer_id).cloned())
    }

    async fn respond_offer(
        &self,
        offer_id: OfferId,
        new_status: OfferStatus,
        responded_at: DateTime<Utc>,
        counter: Option<OfferRecord>,
        acceptance: Option<AcceptanceWrite>,
    ) -> Result<OfferOutcome, EngineError> {
        let mut tables = self.tables.lock().await;

        // Precondition checks first; no partial writes on failure.
        // The PENDING check mirrors the conditional UPDATE in the SQL
        // store: two racers cannot both resolve the same offer.
        match tables.offers.get(&offer_id) {
            None => return Err(EngineError::OfferNotFound(offer_id.to_string())),
            Some(o) if o.status.is_resolved() => {
                return Err(EngineError::OfferAlreadyResolved(offer_id.to_string()))
            }
            Some(_) => {}
        }
        if let Some(acc) = &acceptance {
            let tx = tables
                .transactions
                .get(&acc.transaction_id)
                .ok_or_else(|| EngineError::TransactionNotFound(acc.transaction_id.to_string()))?;
            if tx.version != acc.expected_version {
                return Err(EngineError::VersionConflict);
            }
        }

        if let Some(acc) = acceptance {
            let tx = tables
                .transactions
                .get_mut(&acc.transaction_id)
                .ok_or_else(|| EngineError::TransactionNotFound(acc.transaction_id.to_string()))?;
            tx.status = acc.history.new_status;
            tx.final_amount = Some(acc.final_amount);
            tx.accepted_date = Some(acc.accepted_date);
            tx.version += 1;
            tx.updated_at = Utc::now();
            tables.history.push(acc.history);
        }

        let counter_offer = counter.inspect(|c| {
            tables.offers.insert(c.offer_id, c.clone());
        });

        let offer = tables
            .offers
            .get_mut(&offer_id)
            .ok_or_else(|| EngineError::OfferNotFound(offer_id.to_string()))?;
        offer.status = new_status;
        offer.responded_at = Some(responded_at);

        Ok(OfferOutcome {
            offer: offer.clone(),
            counter_offer,
        })
    }

    async fn fetch_milestone(
        &self,
        milestone_id: MilestoneId,
    ) -> Result<Option<MilestoneRecord>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(tables.milestones.get(&milestone_id).cloned())
    }

    async fn complete_milestone(
        &self,
        milestone_id: MilestoneId,
        completed_by: UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<MilestoneRecord, EngineError> {
        let mut tables = self.tables.lock().await;
        let milestone = tables
            .milestones
            .get_mut(&milestone_id)
            .ok_or_else(|| EngineError::MilestoneNotFound(milestone_id.to_string()))?;
        if milestone.completed_at.is_some() {
            return Err(EngineError::MilestoneAlreadyCompleted(
                milestone_id.to_string(),
            ));
        }
        milestone.completed_at = Some(completed_at);
        milestone.completed_by = Some(completed_by);
        Ok(milestone.clone())
    }
}

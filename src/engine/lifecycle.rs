//! Transaction Lifecycle
//!
//! Top-level state machine operations: create, read, update, list.
//! Every mutation runs as one unit of work against the store (status
//! write + history row + property sync together), followed by a
//! best-effort cache invalidation.

use chrono::Utc;
use tracing::info;

use super::error::EngineError;
use super::milestones::instantiate_checklist;
use super::service::DealService;
use super::state::TransactionStatus;
use super::store::{PropertySync, TransactionChanges};
use super::types::{
    CreateTransaction, HistoryId, Page, StatusHistoryRecord, TransactionFilter, TransactionId,
    TransactionPatch, TransactionRecord, TransactionView, UserId,
};

impl DealService {
    /// Open a new transaction in DRAFT.
    ///
    /// The actor must be the property owner, the declared seller or
    /// the declared agent. The transaction row, its default milestone
    /// checklist and the DRAFT -> DRAFT anchor history row are written
    /// in one unit of work.
    pub async fn create_transaction(
        &self,
        data: CreateTransaction,
        actor: UserId,
    ) -> Result<TransactionRecord, EngineError> {
        let property = self
            .store()
            .find_property(data.property_id)
            .await?
            .ok_or_else(|| EngineError::PropertyNotFound(data.property_id.to_string()))?;

        let allowed = actor == property.owner_id
            || actor == data.seller_id
            || data.agent_id == Some(actor);
        if !allowed {
            return Err(EngineError::Unauthorized);
        }

        let now = Utc::now();
        let transaction = TransactionRecord {
            transaction_id: TransactionId::new(),
            property_id: data.property_id,
            buyer_id: data.buyer_id,
            seller_id: data.seller_id,
            agent_id: data.agent_id,
            deal_type: data.deal_type,
            status: TransactionStatus::Draft,
            offer_amount: data.offer_amount,
            final_amount: None,
            currency: data.currency,
            terms: data.terms,
            expected_completion: data.expected_completion,
            accepted_date: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let milestones = instantiate_checklist(transaction.transaction_id, transaction.deal_type);
        let anchor = StatusHistoryRecord {
            history_id: HistoryId::new(),
            transaction_id: transaction.transaction_id,
            previous_status: TransactionStatus::Draft,
            new_status: TransactionStatus::Draft,
            changed_by: actor,
            reason: Some("created".to_string()),
            created_at: now,
        };

        let created = self
            .store()
            .insert_transaction(transaction, milestones, anchor)
            .await?;

        info!(
            transaction_id = %created.transaction_id,
            property_id = %created.property_id,
            deal_type = %created.deal_type,
            actor = actor,
            "Transaction created"
        );

        self.invalidate_cache(created.transaction_id).await;
        Ok(created)
    }

    /// Fetch a hydrated transaction view. Read-only.
    pub async fn get_transaction(
        &self,
        transaction_id: TransactionId,
        actor: UserId,
    ) -> Result<TransactionView, EngineError> {
        // Authorize before any cache read so cached views cannot leak.
        self.guarded_transaction(transaction_id, actor).await?;

        if let Some(view) = self.cache().get_view(transaction_id).await {
            return Ok(view);
        }

        let view = self
            .store()
            .fetch_view(transaction_id)
            .await?
            .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))?;

        self.cache().put_view(transaction_id, view.clone()).await;
        Ok(view)
    }

    /// Apply a patch to a transaction.
    ///
    /// A status change is validated against the lifecycle edges and
    /// appends a history row; moving to COMPLETED additionally syncs
    /// the property status (PURCHASE -> SOLD, LEASE -> RENTED) inside
    /// the same unit of work, so transaction and property state can
    /// never diverge.
    pub async fn update_transaction(
        &self,
        transaction_id: TransactionId,
        patch: TransactionPatch,
        actor: UserId,
    ) -> Result<TransactionRecord, EngineError> {
        let (transaction, property) = self.guarded_transaction(transaction_id, actor).await?;

        let mut history = None;
        let mut property_sync = None;
        let status_change = patch.status.filter(|s| *s != transaction.status);

        if let Some(new_status) = status_change {
            if !transaction.status.can_transition(new_status) {
                return Err(EngineError::InvalidTransition {
                    from: transaction.status,
                    to: new_status,
                });
            }
            history = Some(StatusHistoryRecord {
                history_id: HistoryId::new(),
                transaction_id,
                previous_status: transaction.status,
                new_status,
                changed_by: actor,
                reason: patch.status_reason.clone(),
                created_at: Utc::now(),
            });
            if new_status == TransactionStatus::Completed {
                property_sync = Some(PropertySync {
                    property_id: property.property_id,
                    status: transaction.deal_type.completed_property_status(),
                });
            }
        }

        let changes = TransactionChanges {
            status: status_change,
            buyer_id: patch.buyer_id,
            agent_id: patch.agent_id,
            offer_amount: patch.offer_amount,
            final_amount: None,
            accepted_date: None,
            terms: patch.terms,
            expected_completion: patch.expected_completion,
        };

        let updated = self
            .store()
            .update_transaction(
                transaction_id,
                transaction.version,
                changes,
                history,
                property_sync,
            )
            .await?;

        if let Some(new_status) = status_change {
            info!(
                transaction_id = %transaction_id,
                from = %transaction.status,
                to = %new_status,
                actor = actor,
                "Transaction status changed"
            );
        }

        self.invalidate_cache(transaction_id).await;
        Ok(updated)
    }

    /// List transactions the actor is a party to, narrowed by
    /// `filter`, newest first. Read-only.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        actor: UserId,
    ) -> Result<Page<TransactionRecord>, EngineError> {
        self.store().list_transactions(actor, &filter).await
    }
}

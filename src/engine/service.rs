//! Deal Service
//!
//! Stateless domain service over an injected persistence gateway and
//! cache. All operation entry points live in `lifecycle`, `offers` and
//! `milestones`; this module owns construction and the guarded-fetch
//! helper every operation authorizes through.

use std::sync::Arc;

use tracing::warn;

use super::auth;
use super::cache::TransactionCache;
use super::error::EngineError;
use super::store::DealStore;
use super::types::{PropertyRecord, TransactionId, TransactionRecord, UserId};

/// The transaction negotiation engine.
pub struct DealService {
    store: Arc<dyn DealStore>,
    cache: Arc<dyn TransactionCache>,
}

impl DealService {
    pub fn new(store: Arc<dyn DealStore>, cache: Arc<dyn TransactionCache>) -> Self {
        Self { store, cache }
    }

    pub(crate) fn store(&self) -> &dyn DealStore {
        self.store.as_ref()
    }

    pub(crate) fn cache(&self) -> &dyn TransactionCache {
        self.cache.as_ref()
    }

    /// Resolve a transaction and its property row, without any
    /// authorization applied. Callers that admit actors from outside
    /// the declared parties (buyer naming in `create_offer`) run
    /// their own membership check on the result.
    pub(crate) async fn resolve_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<(TransactionRecord, PropertyRecord), EngineError> {
        let transaction = self
            .store
            .fetch_transaction(transaction_id)
            .await?
            .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))?;

        let property = self
            .store
            .find_property(transaction.property_id)
            .await?
            .ok_or_else(|| EngineError::PropertyNotFound(transaction.property_id.to_string()))?;

        Ok((transaction, property))
    }

    /// Guarded fetch: resolve the transaction and its property, then
    /// apply the relation-membership predicate.
    ///
    /// Lookup failures and authorization failures stay distinct
    /// (`TRANSACTION_NOT_FOUND` vs `UNAUTHORIZED`); transaction ids
    /// are ULIDs, so the existence signal is not guessable.
    pub(crate) async fn guarded_transaction(
        &self,
        transaction_id: TransactionId,
        actor: UserId,
    ) -> Result<(TransactionRecord, PropertyRecord), EngineError> {
        let (transaction, property) = self.resolve_transaction(transaction_id).await?;

        if !auth::is_participant(&transaction, property.owner_id, actor) {
            return Err(EngineError::Unauthorized);
        }

        Ok((transaction, property))
    }

    /// Post-commit cache invalidation: best-effort, never propagated.
    pub(crate) async fn invalidate_cache(&self, transaction_id: TransactionId) {
        if let Err(e) = self.cache.invalidate(transaction_id).await {
            warn!(
                transaction_id = %transaction_id,
                error = %e,
                "Cache invalidation failed (ignored)"
            );
        }
    }
}

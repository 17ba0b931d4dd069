//! View Cache
//!
//! Best-effort caching of hydrated transaction views. Invalidation is
//! a post-commit side channel: it runs after the unit of work commits,
//! never inside it, and a failing invalidation is logged and swallowed
//! by the caller - it must never fail or revert the business
//! operation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::types::{TransactionId, TransactionView};

/// Cache seam consumed by the engine.
#[async_trait]
pub trait TransactionCache: Send + Sync {
    /// Look up a fresh hydrated view, if cached.
    async fn get_view(&self, transaction_id: TransactionId) -> Option<TransactionView>;

    /// Store a hydrated view (best-effort).
    async fn put_view(&self, transaction_id: TransactionId, view: TransactionView);

    /// Drop any cached state for a transaction. Failures are surfaced
    /// so the engine can log them; they are never propagated further.
    async fn invalidate(&self, transaction_id: TransactionId) -> anyhow::Result<()>;
}

/// No-op cache for tests and cache-less deployments.
pub struct NoopCache;

#[async_trait]
impl TransactionCache for NoopCache {
    async fn get_view(&self, _transaction_id: TransactionId) -> Option<TransactionView> {
        None
    }

    async fn put_view(&self, _transaction_id: TransactionId, _view: TransactionView) {}

    async fn invalidate(&self, _transaction_id: TransactionId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-process TTL cache over a concurrent map.
pub struct ViewCache {
    entries: DashMap<TransactionId, (Instant, TransactionView)>,
    ttl: Duration,
}

impl ViewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TransactionCache for ViewCache {
    async fn get_view(&self, transaction_id: TransactionId) -> Option<TransactionView> {
        let entry = self.entries.get(&transaction_id)?;
        let (stored_at, view) = entry.value();
        if stored_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&transaction_id);
            return None;
        }
        Some(view.clone())
    }

    async fn put_view(&self, transaction_id: TransactionId, view: TransactionView) {
        self.entries.insert(transaction_id, (Instant::now(), view));
    }

    async fn invalidate(&self, transaction_id: TransactionId) -> anyhow::Result<()> {
        self.entries.remove(&transaction_id);
        Ok(())
    }
}

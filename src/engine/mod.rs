//! Transaction Negotiation Engine
//!
//! Coordinates a real-estate deal from first offer to closing:
//! lifecycle state machine, offer/counter-offer negotiation, milestone
//! checklist and an append-only status history, with transaction
//! outcomes synced into property state.
//!
//! # Modules
//!
//! - [`types`] - identifiers and persisted records
//! - [`state`] - transaction/offer state machines
//! - [`error`] - error taxonomy with API codes
//! - [`auth`] - relation-membership authorization predicate
//! - [`milestones`] - checklist templates and completion
//! - [`store`] - persistence gateway contract (atomic units of work)
//! - [`pg`] - PostgreSQL store (sqlx)
//! - [`memory`] - in-process store (dev mode, tests)
//! - [`cache`] - best-effort view cache with post-commit invalidation
//! - [`service`] / [`lifecycle`] / [`offers`] - the operations

pub mod auth;
pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod milestones;
pub mod offers;
pub mod pg;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

pub use cache::{NoopCache, TransactionCache, ViewCache};
pub use error::EngineError;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use service::DealService;
pub use state::{OfferStatus, TransactionStatus};
pub use store::DealStore;
pub use types::{
    CounterOffer, CreateOffer, CreateTransaction, DealType, MilestoneId, MilestoneRecord,
    OfferDecision, OfferId, OfferOutcome, OfferRecord, Page, PropertyId, PropertyRecord,
    PropertyStatus, StatusHistoryRecord, TransactionFilter, TransactionId, TransactionPatch,
    TransactionRecord, TransactionView, UserId,
};

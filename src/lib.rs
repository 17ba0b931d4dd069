//! dealdesk - Real-Estate Transaction Negotiation Engine
//!
//! Coordinates a property deal from first offer to closing.
//!
//! # Modules
//!
//! - [`engine`] - the negotiation core: lifecycle state machine,
//!   offer/counter-offer processing, milestone checklist, append-only
//!   status history, property-status sync
//! - [`gateway`] - thin axum HTTP surface over the engine
//! - [`config`] - YAML application configuration
//! - [`db`] - PostgreSQL connection pool
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod engine;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use engine::{
    DealService, DealStore, DealType, EngineError, MemoryStore, OfferDecision, OfferStatus,
    PgStore, TransactionStatus, ViewCache,
};

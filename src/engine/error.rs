//! Negotiation Engine Error Types

use thiserror::Error;

use super::state::TransactionStatus;

/// Engine error taxonomy.
///
/// Domain errors (`*NotFound`, `Unauthorized`, transition failures)
/// carry explicit codes and propagate to the caller unchanged. Storage
/// failures are caught once at the operation boundary and surface as
/// `Database` without leaking internals into API codes.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    // === Lookup ===
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Offer not found: {0}")]
    OfferNotFound(String),

    #[error("Milestone not found: {0}")]
    MilestoneNotFound(String),

    // === Authorization ===
    #[error("Actor is not a party to this transaction")]
    Unauthorized,

    // === Domain rules ===
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Transaction is closed: {0}")]
    TransactionClosed(String),

    #[error("Offer already resolved: {0}")]
    OfferAlreadyResolved(String),

    #[error("Offer validity window has passed: {0}")]
    OfferExpired(String),

    #[error("Milestone already completed: {0}")]
    MilestoneAlreadyCompleted(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    // === Concurrency ===
    #[error("Transaction was modified concurrently - retry")]
    VersionConflict,

    // === System ===
    #[error("Database error: {0}")]
    Database(String),
}

impl EngineError {
    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
            EngineError::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            EngineError::OfferNotFound(_) => "OFFER_NOT_FOUND",
            EngineError::MilestoneNotFound(_) => "MILESTONE_NOT_FOUND",
            EngineError::Unauthorized => "UNAUTHORIZED",
            EngineError::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
            EngineError::TransactionClosed(_) => "TRANSACTION_CLOSED",
            EngineError::OfferAlreadyResolved(_) => "OFFER_ALREADY_RESOLVED",
            EngineError::OfferExpired(_) => "OFFER_EXPIRED",
            EngineError::MilestoneAlreadyCompleted(_) => "MILESTONE_ALREADY_COMPLETED",
            EngineError::InvalidAmount => "INVALID_AMOUNT",
            EngineError::VersionConflict => "VERSION_CONFLICT",
            EngineError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::PropertyNotFound(_)
            | EngineError::TransactionNotFound(_)
            | EngineError::OfferNotFound(_)
            | EngineError::MilestoneNotFound(_) => 404,
            EngineError::Unauthorized => 403,
            EngineError::InvalidTransition { .. }
            | EngineError::TransactionClosed(_)
            | EngineError::OfferAlreadyResolved(_)
            | EngineError::OfferExpired(_)
            | EngineError::MilestoneAlreadyCompleted(_) => 422,
            EngineError::InvalidAmount => 400,
            EngineError::VersionConflict => 409,
            EngineError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

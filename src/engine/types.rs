//! Negotiation Engine Core Types
//!
//! Identifier newtypes and the persisted records for transactions,
//! offers, milestones and status history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::{OfferStatus, TransactionStatus};

/// Actor identifier - the user id attempting an operation.
pub type UserId = u64;

macro_rules! ulid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// ULID-based: monotonic, sortable, no coordination needed.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(ulid::Ulid);

        impl $name {
            /// Generate a new unique id
            pub fn new() -> Self {
                Self(ulid::Ulid::new())
            }

            /// Get the inner ULID value
            pub fn inner(&self) -> ulid::Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(ulid::Ulid::from_string(s)?))
            }
        }
    };
}

ulid_id!(
    /// Transaction identifier
    TransactionId
);
ulid_id!(
    /// Offer identifier
    OfferId
);
ulid_id!(
    /// Milestone identifier
    MilestoneId
);
ulid_id!(
    /// Property identifier (owned by the external property repository)
    PropertyId
);
ulid_id!(
    /// Status history entry identifier
    HistoryId
);

/// Deal type - drives the milestone checklist and the terminal
/// property status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum DealType {
    Purchase = 1,
    Lease = 2,
}

impl DealType {
    /// Numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(DealType::Purchase),
            2 => Some(DealType::Lease),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealType::Purchase => "PURCHASE",
            DealType::Lease => "LEASE",
        }
    }

    /// Property status a completed deal of this type resolves to.
    pub fn completed_property_status(&self) -> PropertyStatus {
        match self {
            DealType::Purchase => PropertyStatus::Sold,
            DealType::Lease => PropertyStatus::Rented,
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Property listing status, as far as this engine cares.
///
/// The full property model lives in the external property repository;
/// the engine only reads the owner and writes the terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum PropertyStatus {
    Available = 1,
    UnderOffer = 2,
    Sold = 3,
    Rented = 4,
}

impl PropertyStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(PropertyStatus::Available),
            2 => Some(PropertyStatus::UnderOffer),
            3 => Some(PropertyStatus::Sold),
            4 => Some(PropertyStatus::Rented),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "AVAILABLE",
            PropertyStatus::UnderOffer => "UNDER_OFFER",
            PropertyStatus::Sold => "SOLD",
            PropertyStatus::Rented => "RENTED",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The slice of a property row the engine reads.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRecord {
    pub property_id: PropertyId,
    pub owner_id: UserId,
    pub status: PropertyStatus,
}

/// A property deal negotiation, from draft to close.
///
/// Owned exclusively by the lifecycle operations; never deleted
/// (closed deals are retained for audit).
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub property_id: PropertyId,
    /// Unset until an offer names a buyer
    pub buyer_id: Option<UserId>,
    pub seller_id: UserId,
    pub agent_id: Option<UserId>,
    pub deal_type: DealType,
    pub status: TransactionStatus,
    /// Informational initial ask
    pub offer_amount: Option<Decimal>,
    /// Set only on acceptance; equals the accepted offer's amount
    pub final_amount: Option<Decimal>,
    pub currency: String,
    /// Opaque structured terms - stored, never interpreted
    pub terms: Option<serde_json::Value>,
    pub expected_completion: Option<DateTime<Utc>>,
    pub accepted_date: Option<DateTime<Utc>>,
    /// Optimistic concurrency guard; bumped on every mutation
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction[{}] {} property={} seller={} status={} v{}",
            self.transaction_id,
            self.deal_type,
            self.property_id,
            self.seller_id,
            self.status,
            self.version
        )
    }
}

/// A priced proposal tied to a transaction.
///
/// Immutable once written except for `status`/`responded_at`.
/// `parent_offer_id` links counter-offers into a negotiation chain;
/// it is a back-reference only, never an ownership edge.
#[derive(Debug, Clone, Serialize)]
pub struct OfferRecord {
    pub offer_id: OfferId,
    pub transaction_id: TransactionId,
    pub offerer_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub message: Option<String>,
    /// Opaque structured conditions - stored, never interpreted
    pub conditions: Option<serde_json::Value>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: OfferStatus,
    pub parent_offer_id: Option<OfferId>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A checklist item tracking procedural completion within a deal.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneRecord {
    pub milestone_id: MilestoneId,
    pub transaction_id: TransactionId,
    pub title: String,
    pub description: String,
    /// Checklist position, unique per transaction
    pub sequence: i16,
    pub is_required: bool,
    pub due_date: Option<DateTime<Utc>>,
    /// One-way: never cleared once set
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<UserId>,
}

impl MilestoneRecord {
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Append-only audit row; one per status transition.
///
/// Creation writes a degenerate DRAFT -> DRAFT row to anchor the
/// history.
#[derive(Debug, Clone, Serialize)]
pub struct StatusHistoryRecord {
    pub history_id: HistoryId,
    pub transaction_id: TransactionId,
    pub previous_status: TransactionStatus,
    pub new_status: TransactionStatus,
    pub changed_by: UserId,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fully hydrated transaction: offers newest-first, milestones by
/// checklist sequence, history newest-first.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub transaction: TransactionRecord,
    pub offers: Vec<OfferRecord>,
    pub milestones: Vec<MilestoneRecord>,
    pub history: Vec<StatusHistoryRecord>,
}

// ============================================================================
// Operation inputs
// ============================================================================

/// Input for `create_transaction`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransaction {
    pub property_id: PropertyId,
    pub seller_id: UserId,
    #[serde(default)]
    pub buyer_id: Option<UserId>,
    #[serde(default)]
    pub agent_id: Option<UserId>,
    pub deal_type: DealType,
    #[serde(default)]
    pub offer_amount: Option<Decimal>,
    pub currency: String,
    #[serde(default)]
    pub terms: Option<serde_json::Value>,
    #[serde(default)]
    pub expected_completion: Option<DateTime<Utc>>,
}

/// Patch for `update_transaction`; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    /// Recorded in the history row when `status` changes
    #[serde(default)]
    pub status_reason: Option<String>,
    #[serde(default)]
    pub buyer_id: Option<UserId>,
    #[serde(default)]
    pub agent_id: Option<UserId>,
    #[serde(default)]
    pub offer_amount: Option<Decimal>,
    #[serde(default)]
    pub terms: Option<serde_json::Value>,
    #[serde(default)]
    pub expected_completion: Option<DateTime<Utc>>,
}

/// Input for `create_offer`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOffer {
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    /// Defaults to the transaction currency when omitted
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Counter-offer payload supplied with an `OfferDecision::Counter`.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterOffer {
    pub amount: Decimal,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// The responder's decision on a pending offer.
///
/// Counter data travels with the decision, so a counter without its
/// payload is unrepresentable.
#[derive(Debug, Clone)]
pub enum OfferDecision {
    Accept,
    Reject,
    Counter(CounterOffer),
}

impl OfferDecision {
    /// Terminal status this decision resolves the target offer to.
    pub fn resolved_status(&self) -> OfferStatus {
        match self {
            OfferDecision::Accept => OfferStatus::Accepted,
            OfferDecision::Reject => OfferStatus::Rejected,
            OfferDecision::Counter(_) => OfferStatus::Countered,
        }
    }
}

/// Result of `respond_to_offer`: the resolved offer and, for the
/// counter branch, the newly created counter-offer.
#[derive(Debug, Clone, Serialize)]
pub struct OfferOutcome {
    pub offer: OfferRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<OfferRecord>,
}

/// Filters for `list_transactions`. The actor relation filter
/// (buyer/seller/agent/owner) is always applied on top of these.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub statuses: Vec<TransactionStatus>,
    #[serde(default)]
    pub deal_type: Option<DealType>,
    #[serde(default)]
    pub property_id: Option<PropertyId>,
    #[serde(default)]
    pub buyer_id: Option<UserId>,
    #[serde(default)]
    pub seller_id: Option<UserId>,
    #[serde(default)]
    pub agent_id: Option<UserId>,
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl TransactionFilter {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.per_page() as u64
    }
}

/// One page of a filtered listing, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_ids_unique() {
        assert_ne!(OfferId::new(), OfferId::new());
    }

    #[test]
    fn test_deal_type_roundtrip() {
        assert_eq!(DealType::from_id(1), Some(DealType::Purchase));
        assert_eq!(DealType::from_id(2), Some(DealType::Lease));
        assert_eq!(DealType::from_id(0), None);
        assert_eq!(DealType::from_id(3), None);
    }

    #[test]
    fn test_completed_property_status() {
        assert_eq!(
            DealType::Purchase.completed_property_status(),
            PropertyStatus::Sold
        );
        assert_eq!(
            DealType::Lease.completed_property_status(),
            PropertyStatus::Rented
        );
    }

    #[test]
    fn test_property_status_roundtrip() {
        for id in 1..=4 {
            let status = PropertyStatus::from_id(id).unwrap();
            assert_eq!(status.id(), id);
        }
        assert!(PropertyStatus::from_id(0).is_none());
        assert!(PropertyStatus::from_id(5).is_none());
    }

    #[test]
    fn test_decision_resolved_status() {
        assert_eq!(OfferDecision::Accept.resolved_status(), OfferStatus::Accepted);
        assert_eq!(OfferDecision::Reject.resolved_status(), OfferStatus::Rejected);
        let counter = OfferDecision::Counter(CounterOffer {
            amount: Decimal::new(100, 0),
            message: None,
            conditions: None,
            valid_until: None,
        });
        assert_eq!(counter.resolved_status(), OfferStatus::Countered);
    }

    #[test]
    fn test_filter_paging_defaults() {
        let filter = TransactionFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), TransactionFilter::DEFAULT_PER_PAGE);
        assert_eq!(filter.offset(), 0);

        let filter = TransactionFilter {
            page: Some(3),
            per_page: Some(1000),
            ..Default::default()
        };
        assert_eq!(filter.per_page(), TransactionFilter::MAX_PER_PAGE);
        assert_eq!(filter.offset(), 2 * TransactionFilter::MAX_PER_PAGE as u64);
    }
}

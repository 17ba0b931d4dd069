//! Transaction and Offer State Machines
//!
//! State IDs are designed for PostgreSQL storage as SMALLINT.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transaction lifecycle states.
///
/// Main line: DRAFT -> PENDING -> ACCEPTED -> COMPLETED.
/// REJECTED and CANCELLED are side branches reachable via
/// caller-driven status updates. Terminal states: COMPLETED,
/// REJECTED, CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TransactionStatus {
    Draft = 0,
    Pending = 10,
    Accepted = 20,
    /// Terminal: deal closed, property status synced
    Completed = 30,
    /// Terminal: negotiation rejected
    Rejected = -10,
    /// Terminal: withdrawn by a party
    Cancelled = -20,
}

impl TransactionStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed
                | TransactionStatus::Rejected
                | TransactionStatus::Cancelled
        )
    }

    /// Whether the lifecycle state machine permits `self -> to`.
    ///
    /// The degenerate DRAFT -> DRAFT anchor row at creation is not a
    /// transition and is written outside this check.
    pub fn can_transition(&self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, to) {
            (Draft, Pending) => true,
            (Pending, Accepted) => true,
            (Accepted, Completed) => true,
            // Side branches: rejection while negotiating, cancellation
            // any time before close.
            (Draft | Pending, Rejected) => true,
            (Draft | Pending | Accepted, Cancelled) => true,
            _ => false,
        }
    }

    /// Numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TransactionStatus::Draft),
            10 => Some(TransactionStatus::Pending),
            20 => Some(TransactionStatus::Accepted),
            30 => Some(TransactionStatus::Completed),
            -10 => Some(TransactionStatus::Rejected),
            -20 => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Draft => "DRAFT",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Accepted => "ACCEPTED",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Rejected => "REJECTED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TransactionStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TransactionStatus::from_id(value).ok_or(())
    }
}

/// Offer states. PENDING is the only live state; the other three are
/// terminal and stamped together with `responded_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum OfferStatus {
    Pending = 0,
    Accepted = 10,
    Rejected = -10,
    Countered = 20,
}

impl OfferStatus {
    /// A responded offer never changes again.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(OfferStatus::Pending),
            10 => Some(OfferStatus::Accepted),
            -10 => Some(OfferStatus::Rejected),
            20 => Some(OfferStatus::Countered),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Countered => "COUNTERED",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for OfferStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        OfferStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());

        assert!(!TransactionStatus::Draft.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Accepted.is_terminal());
    }

    #[test]
    fn test_main_line_transitions() {
        use TransactionStatus::*;
        assert!(Draft.can_transition(Pending));
        assert!(Pending.can_transition(Accepted));
        assert!(Accepted.can_transition(Completed));
    }

    #[test]
    fn test_side_branches() {
        use TransactionStatus::*;
        assert!(Draft.can_transition(Cancelled));
        assert!(Pending.can_transition(Rejected));
        assert!(Pending.can_transition(Cancelled));
        assert!(Accepted.can_transition(Cancelled));
        assert!(!Accepted.can_transition(Rejected));
    }

    #[test]
    fn test_no_skipping_or_reviving() {
        use TransactionStatus::*;
        assert!(!Draft.can_transition(Accepted));
        assert!(!Draft.can_transition(Completed));
        assert!(!Pending.can_transition(Completed));
        assert!(!Pending.can_transition(Draft));
        // Terminal states are dead ends
        for terminal in [Completed, Rejected, Cancelled] {
            for to in [Draft, Pending, Accepted, Completed, Rejected, Cancelled] {
                assert!(!terminal.can_transition(to), "{} -> {}", terminal, to);
            }
        }
    }

    #[test]
    fn test_transaction_status_id_roundtrip() {
        use TransactionStatus::*;
        for status in [Draft, Pending, Accepted, Completed, Rejected, Cancelled] {
            assert_eq!(TransactionStatus::from_id(status.id()), Some(status));
        }
        assert!(TransactionStatus::from_id(999).is_none());
    }

    #[test]
    fn test_offer_status_resolution() {
        assert!(!OfferStatus::Pending.is_resolved());
        assert!(OfferStatus::Accepted.is_resolved());
        assert!(OfferStatus::Rejected.is_resolved());
        assert!(OfferStatus::Countered.is_resolved());
    }

    #[test]
    fn test_offer_status_id_roundtrip() {
        use OfferStatus::*;
        for status in [Pending, Accepted, Rejected, Countered] {
            assert_eq!(OfferStatus::from_id(status.id()), Some(status));
        }
        assert!(OfferStatus::from_id(5).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionStatus::Draft.to_string(), "DRAFT");
        assert_eq!(TransactionStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(OfferStatus::Countered.to_string(), "COUNTERED");
    }
}

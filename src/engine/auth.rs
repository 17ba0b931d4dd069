//! Authorization Guard
//!
//! One relation-membership predicate shared by every read and mutation:
//! an actor touches a transaction iff they are its buyer, seller or
//! agent, or they own the underlying property. There is no role
//! hierarchy and no admin bypass.

use super::types::{TransactionRecord, UserId};

/// Check whether `actor` is a party to `transaction`.
///
/// `property_owner` is the owner id of the transaction's property,
/// resolved by the caller so the predicate itself stays pure.
pub fn is_participant(
    transaction: &TransactionRecord,
    property_owner: UserId,
    actor: UserId,
) -> bool {
    transaction.buyer_id == Some(actor)
        || transaction.seller_id == actor
        || transaction.agent_id == Some(actor)
        || property_owner == actor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::TransactionStatus;
    use crate::engine::types::{DealType, PropertyId, TransactionId};
    use chrono::Utc;

    fn transaction(buyer: Option<UserId>, seller: UserId, agent: Option<UserId>) -> TransactionRecord {
        let now = Utc::now();
        TransactionRecord {
            transaction_id: TransactionId::new(),
            property_id: PropertyId::new(),
            buyer_id: buyer,
            seller_id: seller,
            agent_id: agent,
            deal_type: DealType::Purchase,
            status: TransactionStatus::Draft,
            offer_amount: None,
            final_amount: None,
            currency: "USD".to_string(),
            terms: None,
            expected_completion: None,
            accepted_date: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_all_relations_pass() {
        let tx = transaction(Some(1), 2, Some(3));
        assert!(is_participant(&tx, 4, 1)); // buyer
        assert!(is_participant(&tx, 4, 2)); // seller
        assert!(is_participant(&tx, 4, 3)); // agent
        assert!(is_participant(&tx, 4, 4)); // property owner
    }

    #[test]
    fn test_stranger_fails() {
        let tx = transaction(Some(1), 2, Some(3));
        assert!(!is_participant(&tx, 4, 99));
    }

    #[test]
    fn test_unset_relations_do_not_match() {
        let tx = transaction(None, 2, None);
        assert!(!is_participant(&tx, 4, 0));
        assert!(!is_participant(&tx, 4, 99));
        assert!(is_participant(&tx, 4, 2));
    }
}

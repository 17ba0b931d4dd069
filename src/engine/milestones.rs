//! Milestone Tracker
//!
//! Default checklist generation keyed by deal type, and milestone
//! completion. The checklist is instantiated atomically with
//! transaction creation; completion is one-way and unordered (no
//! enforcement that earlier required milestones finish first - that
//! ordering is caller policy).

use chrono::Utc;
use tracing::info;

use super::error::EngineError;
use super::service::DealService;
use super::types::{MilestoneId, MilestoneRecord, TransactionId, UserId};
use crate::engine::types::DealType;

/// One entry of the default checklist template.
#[derive(Debug, Clone, Copy)]
pub struct MilestoneTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub sequence: i16,
    pub is_required: bool,
}

/// Shared prefix for every deal type (sequence 1-3).
const COMMON_PREFIX: [MilestoneTemplate; 3] = [
    MilestoneTemplate {
        title: "Initial Offer",
        description: "First offer submitted by a prospective buyer",
        sequence: 1,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Offer Acceptance",
        description: "Seller accepts an offer",
        sequence: 2,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Documentation Review",
        description: "Review of contracts and disclosures",
        sequence: 3,
        is_required: true,
    },
];

const PURCHASE_SUFFIX: [MilestoneTemplate; 4] = [
    MilestoneTemplate {
        title: "Property Inspection",
        description: "Professional inspection of the property",
        sequence: 4,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Mortgage Approval",
        description: "Buyer financing approved by lender",
        sequence: 5,
        is_required: false,
    },
    MilestoneTemplate {
        title: "Final Walkthrough",
        description: "Buyer's final walkthrough before closing",
        sequence: 6,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Closing",
        description: "Signing, funds transfer and handover of keys",
        sequence: 7,
        is_required: true,
    },
];

const LEASE_SUFFIX: [MilestoneTemplate; 3] = [
    MilestoneTemplate {
        title: "Lease Agreement",
        description: "Lease contract signed by both parties",
        sequence: 4,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Security Deposit",
        description: "Deposit received and held in escrow",
        sequence: 5,
        is_required: true,
    },
    MilestoneTemplate {
        title: "Move-in Inspection",
        description: "Condition report at move-in",
        sequence: 6,
        is_required: true,
    },
];

/// Default checklist for a deal type: the shared prefix plus the
/// type-specific suffix. PURCHASE yields 7 entries, LEASE yields 6.
pub fn default_checklist(deal_type: DealType) -> Vec<MilestoneTemplate> {
    let suffix: &[MilestoneTemplate] = match deal_type {
        DealType::Purchase => &PURCHASE_SUFFIX,
        DealType::Lease => &LEASE_SUFFIX,
    };
    COMMON_PREFIX.iter().chain(suffix).copied().collect()
}

/// Instantiate the default checklist for a new transaction.
pub fn instantiate_checklist(
    transaction_id: TransactionId,
    deal_type: DealType,
) -> Vec<MilestoneRecord> {
    default_checklist(deal_type)
        .into_iter()
        .map(|t| MilestoneRecord {
            milestone_id: MilestoneId::new(),
            transaction_id,
            title: t.title.to_string(),
            description: t.description.to_string(),
            sequence: t.sequence,
            is_required: t.is_required,
            due_date: None,
            completed_at: None,
            completed_by: None,
        })
        .collect()
}

impl DealService {
    /// Mark a milestone as completed by `actor`.
    ///
    /// The actor must be a party to the owning transaction.
    /// Re-completing an already-completed milestone fails with
    /// `MILESTONE_ALREADY_COMPLETED`; `completed_at` is never
    /// overwritten.
    pub async fn complete_milestone(
        &self,
        milestone_id: MilestoneId,
        actor: UserId,
    ) -> Result<MilestoneRecord, EngineError> {
        let milestone = self
            .store()
            .fetch_milestone(milestone_id)
            .await?
            .ok_or_else(|| EngineError::MilestoneNotFound(milestone_id.to_string()))?;

        let (_tx, _property) = self
            .guarded_transaction(milestone.transaction_id, actor)
            .await?;

        if milestone.is_completed() {
            return Err(EngineError::MilestoneAlreadyCompleted(
                milestone_id.to_string(),
            ));
        }

        let completed = self
            .store()
            .complete_milestone(milestone_id, actor, Utc::now())
            .await?;

        info!(
            milestone_id = %milestone_id,
            transaction_id = %milestone.transaction_id,
            actor = actor,
            title = %completed.title,
            "Milestone completed"
        );

        self.invalidate_cache(milestone.transaction_id).await;
        Ok(completed)
    }
}

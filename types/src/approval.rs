//! Co-signer approvals of a proposal.

use crate::keys::{EventId, PublicKey};
use crate::proposal::ProposalType;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Partially signed transaction contributed by one approver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPsbt {
    pub psbt: String,
}

/// Encrypted body of an approval event, keyed by the approved proposal's type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalContent {
    Spending(ApprovalPsbt),
    ProofOfReserve(ApprovalPsbt),
}

impl ApprovalContent {
    pub fn new(proposal_type: ProposalType, psbt: String) -> Self {
        match proposal_type {
            ProposalType::Spending => Self::Spending(ApprovalPsbt { psbt }),
            ProposalType::ProofOfReserve => Self::ProofOfReserve(ApprovalPsbt { psbt }),
        }
    }

    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::Spending(_) => ProposalType::Spending,
            Self::ProofOfReserve(_) => ProposalType::ProofOfReserve,
        }
    }

    pub fn into_psbt(self) -> String {
        match self {
            Self::Spending(a) | Self::ProofOfReserve(a) => a.psbt,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Active,
    Expired,
}

impl ApprovalStatus {
    pub fn at(expiration: Timestamp, now: Timestamp) -> Self {
        if expiration.has_passed(now) {
            Self::Expired
        } else {
            Self::Active
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedProposal {
    pub approval_id: EventId,
    pub proposal_id: EventId,
    pub policy_id: EventId,
    pub proposal_type: ProposalType,
    pub psbt: String,
    pub approved_by: PublicKey,
    pub approval_date: Timestamp,
    pub expiration_date: Timestamp,
    pub status: ApprovalStatus,
}

impl ApprovedProposal {
    pub fn with_status(&self, status: ApprovalStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flips_at_expiration() {
        let exp = Timestamp::new(100);
        assert_eq!(ApprovalStatus::at(exp, Timestamp::new(99)), ApprovalStatus::Active);
        assert_eq!(ApprovalStatus::at(exp, Timestamp::new(100)), ApprovalStatus::Expired);
    }

    #[test]
    fn content_round_trips_the_psbt() {
        let content = ApprovalContent::new(ProposalType::Spending, "cHNidP8=".into());
        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"{"spending":{"psbt":"cHNidP8="}}"#);
        let back: ApprovalContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.proposal_type(), ProposalType::Spending);
        assert_eq!(back.into_psbt(), "cHNidP8=");
    }
}

//! Completed proposals: the terminal record that supersedes a proposal and its approvals.

use crate::keys::{EventId, PublicKey};
use crate::proposal::{ProofOfReserveProposal, ProposalType};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSpending {
    /// Finalized transaction, hex encoded.
    pub tx: String,
    pub description: String,
}

/// Encrypted body of a completed-proposal event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletedContent {
    Spending(CompletedSpending),
    ProofOfReserve(ProofOfReserveProposal),
}

impl CompletedContent {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::Spending(_) => ProposalType::Spending,
            Self::ProofOfReserve(_) => ProposalType::ProofOfReserve,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedProposal {
    pub id: EventId,
    pub proposal_id: EventId,
    pub policy_id: EventId,
    pub completed_by: PublicKey,
    pub completion_date: Timestamp,
    pub content: CompletedContent,
    /// Transaction id of a completed spend; `None` for proof-of-reserve.
    pub tx_id: Option<String>,
}

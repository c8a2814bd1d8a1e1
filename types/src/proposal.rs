//! Spending and proof-of-reserve proposals.

use crate::keys::EventId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signer attribution used when none of the caller's fingerprints appear in
/// the proposal descriptor.
pub const UNKNOWN_SIGNER: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    Spending,
    ProofOfReserve,
}

impl fmt::Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spending => f.write_str("spending"),
            Self::ProofOfReserve => f.write_str("proof_of_reserve"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingProposal {
    pub descriptor: String,
    pub psbt: String,
    pub to_address: String,
    pub amount: u64,
    pub description: String,
    #[serde(default)]
    pub utxos: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfReserveProposal {
    pub descriptor: String,
    pub psbt: String,
    pub message: String,
}

/// Encrypted body of a proposal event. The variant is the single top-level key
/// of the JSON object, e.g. `{"spending": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalContent {
    Spending(SpendingProposal),
    ProofOfReserve(ProofOfReserveProposal),
}

impl ProposalContent {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::Spending(_) => ProposalType::Spending,
            Self::ProofOfReserve(_) => ProposalType::ProofOfReserve,
        }
    }

    pub fn descriptor(&self) -> &str {
        match self {
            Self::Spending(p) => &p.descriptor,
            Self::ProofOfReserve(p) => &p.descriptor,
        }
    }

    pub fn psbt(&self) -> &str {
        match self {
            Self::Spending(p) => &p.psbt,
            Self::ProofOfReserve(p) => &p.psbt,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Unsigned,
    Signed,
}

impl ProposalStatus {
    pub fn from_signed(fully_signed: bool) -> Self {
        if fully_signed {
            Self::Signed
        } else {
            Self::Unsigned
        }
    }
}

/// A decrypted proposal against a policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: EventId,
    pub policy_id: EventId,
    pub content: ProposalContent,
    pub status: ProposalStatus,
    /// Fingerprint of the caller's signer found in the descriptor, or [`UNKNOWN_SIGNER`].
    pub signer: String,
    pub fee: u64,
    pub created_at: Timestamp,
}

impl Proposal {
    pub fn proposal_type(&self) -> ProposalType {
        self.content.proposal_type()
    }

    pub fn descriptor(&self) -> &str {
        self.content.descriptor()
    }

    pub fn psbt(&self) -> &str {
        self.content.psbt()
    }

    /// A copy of this proposal carrying `status`. Cached proposals are replaced
    /// by this copy, never modified.
    pub fn with_status(&self, status: ProposalStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// First fingerprint that occurs in the descriptor text.
pub fn find_signer<'a>(
    fingerprints: impl IntoIterator<Item = &'a str>,
    descriptor: &str,
) -> Option<&'a str> {
    fingerprints
        .into_iter()
        .find(|fp| !fp.is_empty() && descriptor.contains(fp))
}

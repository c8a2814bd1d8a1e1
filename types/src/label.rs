//! Policy-scoped annotations on addresses and UTXOs.

use crate::keys::EventId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// The thing a label is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelData {
    Address(String),
    Utxo(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub data: LabelData,
    pub text: String,
}

impl Label {
    pub fn address(address: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            data: LabelData::Address(address.into()),
            text: text.into(),
        }
    }

    pub fn utxo(outpoint: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            data: LabelData::Utxo(outpoint.into()),
            text: text.into(),
        }
    }
}

/// A decrypted label event. `label_id` is the replaceable `d` identifier;
/// only the newest event per identifier is kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedLabel {
    pub id: EventId,
    pub label_id: String,
    pub policy_id: EventId,
    pub label: Label,
    pub created_at: Timestamp,
}

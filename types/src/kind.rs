//! Event kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer discriminator for an event's semantic type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(pub u32);

impl Kind {
    pub const METADATA: Self = Self(0);
    pub const CONTACTS: Self = Self(3);
    pub const EVENT_DELETION: Self = Self(5);
    pub const SHARED_KEY: Self = Self(9288);
    pub const POLICY: Self = Self(9289);
    pub const PROPOSAL: Self = Self(9290);
    pub const APPROVED_PROPOSAL: Self = Self(9291);
    pub const COMPLETED_PROPOSAL: Self = Self(9292);
    pub const SIGNERS: Self = Self(9294);
    pub const SHARED_SIGNERS: Self = Self(9295);
    pub const LABELS: Self = Self(32121);

    /// Every kind the engine has a handler for, in dispatch order.
    ///
    /// Keys come before the content they unlock, approvals before the
    /// proposals whose status depends on them, and deletions last.
    pub const DISPATCH_ORDER: [Kind; 11] = [
        Self::SHARED_KEY,
        Self::POLICY,
        Self::SIGNERS,
        Self::SHARED_SIGNERS,
        Self::METADATA,
        Self::CONTACTS,
        Self::LABELS,
        Self::APPROVED_PROPOSAL,
        Self::PROPOSAL,
        Self::COMPLETED_PROPOSAL,
        Self::EVENT_DELETION,
    ];

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::METADATA => "metadata",
            Self::CONTACTS => "contacts",
            Self::EVENT_DELETION => "event_deletion",
            Self::SHARED_KEY => "shared_key",
            Self::POLICY => "policy",
            Self::PROPOSAL => "proposal",
            Self::APPROVED_PROPOSAL => "approved_proposal",
            Self::COMPLETED_PROPOSAL => "completed_proposal",
            Self::SIGNERS => "signers",
            Self::SHARED_SIGNERS => "shared_signers",
            Self::LABELS => "labels",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "kind({})", self.0),
        }
    }
}

impl From<u32> for Kind {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

//! Spending policies jointly owned by their participants.

use crate::keys::{EventId, PublicKey};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Encrypted body of a policy event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyContent {
    pub name: String,
    pub description: String,
    pub descriptor: String,
    #[serde(default)]
    pub ui_metadata: serde_json::Value,
}

/// A decrypted policy as seen by one of its participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: EventId,
    pub name: String,
    pub description: String,
    pub descriptor: String,
    /// Miniscript form of `descriptor`, when the Bitcoin utility could derive it.
    pub miniscript: Option<String>,
    pub ui_metadata: serde_json::Value,
    pub participants: Vec<PublicKey>,
    pub created_at: Timestamp,
}

impl Policy {
    pub fn from_content(
        id: EventId,
        content: PolicyContent,
        miniscript: Option<String>,
        participants: Vec<PublicKey>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: content.name,
            description: content.description,
            descriptor: content.descriptor,
            miniscript,
            ui_metadata: content.ui_metadata,
            participants,
            created_at,
        }
    }

    pub fn is_participant(&self, key: &PublicKey) -> bool {
        self.participants.contains(key)
    }
}

/// `{since, until, limit}` window over list queries. Results are newest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl Pagination {
    pub fn since(mut self, at: Timestamp) -> Self {
        self.since = Some(at);
        self
    }

    pub fn until(mut self, at: Timestamp) -> Self {
        self.until = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `since` is inclusive, `until` exclusive.
    pub fn contains(&self, at: Timestamp) -> bool {
        self.since.map_or(true, |s| at >= s) && self.until.map_or(true, |u| at < u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_tolerates_missing_ui_metadata() {
        let content: PolicyContent =
            serde_json::from_str(r#"{"name":"n","description":"d","descriptor":"tr(x)"}"#).unwrap();
        assert!(content.ui_metadata.is_null());
    }

    #[test]
    fn pagination_window_bounds() {
        let page = Pagination::default()
            .since(Timestamp::new(10))
            .until(Timestamp::new(20));
        assert!(!page.contains(Timestamp::new(9)));
        assert!(page.contains(Timestamp::new(10)));
        assert!(page.contains(Timestamp::new(19)));
        assert!(!page.contains(Timestamp::new(20)));
    }
}

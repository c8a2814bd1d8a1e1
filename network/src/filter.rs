//! Event subscription filters.
//!
//! A [`Filter`] matches an event when every populated field matches; a list
//! query over several filters returns the union.

use std::collections::BTreeSet;

use cosign_types::{Event, EventId, Kind, Pagination, PublicKey, TagKind, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub ids: BTreeSet<EventId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub kinds: BTreeSet<Kind>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub authors: BTreeSet<PublicKey>,
    /// Events carrying a `p` tag for any of these keys.
    #[serde(rename = "#p", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pubkeys: BTreeSet<PublicKey>,
    /// Events carrying an `e` tag for any of these ids.
    #[serde(rename = "#e", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub events: BTreeSet<EventId>,
    #[serde(rename = "#d", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub identifiers: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: EventId) -> Self {
        self.ids.insert(id);
        self
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = EventId>) -> Self {
        self.ids.extend(ids);
        self
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    pub fn author(mut self, author: PublicKey) -> Self {
        self.authors.insert(author);
        self
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = PublicKey>) -> Self {
        self.authors.extend(authors);
        self
    }

    pub fn pubkey(mut self, pubkey: PublicKey) -> Self {
        self.pubkeys.insert(pubkey);
        self
    }

    pub fn events(mut self, ids: impl IntoIterator<Item = EventId>) -> Self {
        self.events.extend(ids);
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifiers.insert(identifier.into());
        self
    }

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

    pub fn pagination(mut self, page: &Pagination) -> Self {
        self.since = page.since.or(self.since);
        self.until = page.until.or(self.until);
        self.limit = page.limit.or(self.limit);
        self
    }

    /// `since` is inclusive and `until` exclusive, matching [`Pagination`].
    pub fn matches(&self, event: &Event) -> bool {
        (self.ids.is_empty() || self.ids.contains(&event.id))
            && (self.kinds.is_empty() || self.kinds.contains(&event.kind))
            && (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && (self.pubkeys.is_empty()
                || has_tag(event, TagKind::PubKey, |v| {
                    PublicKey::from_hex(v).is_ok_and(|pk| self.pubkeys.contains(&pk))
                }))
            && (self.events.is_empty()
                || has_tag(event, TagKind::Event, |v| {
                    EventId::from_hex(v).is_ok_and(|id| self.events.contains(&id))
                }))
            && (self.identifiers.is_empty()
                || has_tag(event, TagKind::Identifier, |v| self.identifiers.contains(v)))
            && self.since.map_or(true, |s| event.created_at >= s)
            && self.until.map_or(true, |u| event.created_at < u)
    }
}

fn has_tag(event: &Event, kind: TagKind, wanted: impl Fn(&str) -> bool) -> bool {
    event.tag_values(kind).any(|v| wanted(v))
}

/// Whether any of `filters` matches `event`.
pub fn any_match(filters: &[Filter], event: &Event) -> bool {
    filters.iter().any(|f| f.matches(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosign_types::{Signature, Tag};

    fn event(kind: Kind, tags: Vec<Tag>, at: u64) -> Event {
        Event {
            id: EventId([at as u8; 32]),
            pubkey: PublicKey([1; 32]),
            created_at: Timestamp::new(at),
            kind,
            tags,
            content: String::new(),
            sig: Signature([0; 64]),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&event(Kind::POLICY, vec![], 1)));
    }

    #[test]
    fn tag_filters_require_a_matching_tag() {
        let me = PublicKey([7; 32]);
        let policy = EventId([9; 32]);
        let grant = event(
            Kind::SHARED_KEY,
            vec![Tag::event(&policy), Tag::pubkey(&me)],
            1,
        );

        let filter = Filter::new().kind(Kind::SHARED_KEY).events([policy]).pubkey(me);
        assert!(filter.matches(&grant));

        let other = Filter::new().kind(Kind::SHARED_KEY).pubkey(PublicKey([8; 32]));
        assert!(!other.matches(&grant));
    }

    #[test]
    fn time_window_is_half_open() {
        let filter = Filter::new().since(Timestamp::new(10)).until(Timestamp::new(20));
        assert!(!filter.matches(&event(Kind::POLICY, vec![], 9)));
        assert!(filter.matches(&event(Kind::POLICY, vec![], 10)));
        assert!(!filter.matches(&event(Kind::POLICY, vec![], 20)));
    }

    #[test]
    fn serializes_tag_fields_with_hash_prefix() {
        let json = serde_json::to_value(Filter::new().kind(Kind::POLICY).pubkey(PublicKey([1; 32])))
            .unwrap();
        assert_eq!(json["kinds"], serde_json::json!([9289]));
        assert!(json.get("#p").is_some());
        assert!(json.get("ids").is_none());
    }
}

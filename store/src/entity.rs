use cosign_types::Timestamp;
use std::fmt::Debug;
use std::hash::Hash;

/// A cacheable record with a primary key and optional secondary indexes.
///
/// Entities are immutable once stored: a changed record replaces the old one
/// under the same key.
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    /// Store name used in errors and logs.
    const NAME: &'static str;

    /// Secondary index names this entity populates.
    const INDEXES: &'static [&'static str] = &[];

    fn key(&self) -> Self::Key;

    fn created_at(&self) -> Timestamp;

    /// Value of the named secondary index, or `None` when the entity has no
    /// value for it.
    fn index_value(&self, _index: &str) -> Option<String> {
        None
    }
}

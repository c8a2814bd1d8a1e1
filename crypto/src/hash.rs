//! Blake2b hashing for event ids and key derivation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use cosign_types::{EventId, UnsignedEvent};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Id of an event: the hash of its canonical serialization.
pub fn compute_event_id(unsigned: &UnsignedEvent) -> EventId {
    EventId(blake2b_256(&unsigned.canonical_bytes()))
}

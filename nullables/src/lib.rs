//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Every external collaborator of the engine (relays, the Bitcoin utility,
//! the clock) is abstracted behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod bitcoin;
pub mod clock;
pub mod relay;

pub use bitcoin::NullBitcoin;
pub use clock::NullClock;
pub use relay::NullRelay;

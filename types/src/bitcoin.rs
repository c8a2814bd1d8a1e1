//! Contract of the Bitcoin utility the engine delegates PSBT and descriptor work to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BitcoinError {
    #[error("invalid psbt: {0}")]
    InvalidPsbt(String),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid miniscript: {0}")]
    InvalidMiniscript(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// Descriptor, miniscript and PSBT operations.
///
/// Implementations must be pure with respect to their inputs: the engine may
/// call them repeatedly for the same values while reprocessing events.
pub trait BitcoinUtil: Send + Sync {
    /// Fee paid by the transaction in `psbt`, in satoshis.
    fn fee(&self, psbt: &str) -> Result<u64, BitcoinError>;

    /// Whether combining `psbts` yields a finalizable transaction.
    fn is_fully_signed(&self, psbts: &[String]) -> Result<bool, BitcoinError>;

    fn to_descriptor(&self, miniscript: &str) -> Result<String, BitcoinError>;

    fn to_miniscript(&self, descriptor: &str) -> Result<String, BitcoinError>;

    /// Transaction id of a hex encoded transaction.
    fn tx_id(&self, tx: &str) -> Result<String, BitcoinError>;
}

//! Nullable Bitcoin utility with configurable fees and signing thresholds.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use cosign_types::{BitcoinError, BitcoinUtil};

/// A deterministic stand-in for the descriptor and PSBT library.
///
/// - `fee` returns the fee registered for a PSBT, or the default fee.
/// - `is_fully_signed` is true once the number of distinct PSBTs reaches the
///   configured threshold (never, by default).
/// - descriptors are `wsh(<miniscript>)`.
pub struct NullBitcoin {
    default_fee: AtomicU64,
    fees: Mutex<HashMap<String, u64>>,
    threshold: AtomicUsize,
    invalid_psbts: Mutex<HashSet<String>>,
}

impl NullBitcoin {
    pub fn new() -> Self {
        Self {
            default_fee: AtomicU64::new(0),
            fees: Mutex::new(HashMap::new()),
            threshold: AtomicUsize::new(usize::MAX),
            invalid_psbts: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_threshold(self, threshold: usize) -> Self {
        self.set_threshold(threshold);
        self
    }

    pub fn set_threshold(&self, threshold: usize) {
        self.threshold.store(threshold, Ordering::SeqCst);
    }

    pub fn set_default_fee(&self, fee: u64) {
        self.default_fee.store(fee, Ordering::SeqCst);
    }

    pub fn set_fee(&self, psbt: impl Into<String>, fee: u64) {
        self.fees.lock().unwrap().insert(psbt.into(), fee);
    }

    /// Make every operation on `psbt` fail as unparsable.
    pub fn mark_invalid(&self, psbt: impl Into<String>) {
        self.invalid_psbts.lock().unwrap().insert(psbt.into());
    }

    fn check(&self, psbt: &str) -> Result<(), BitcoinError> {
        if self.invalid_psbts.lock().unwrap().contains(psbt) {
            return Err(BitcoinError::InvalidPsbt(psbt.to_string()));
        }
        Ok(())
    }
}

impl Default for NullBitcoin {
    fn default() -> Self {
        Self::new()
    }
}

impl BitcoinUtil for NullBitcoin {
    fn fee(&self, psbt: &str) -> Result<u64, BitcoinError> {
        self.check(psbt)?;
        let fees = self.fees.lock().unwrap();
        Ok(fees
            .get(psbt)
            .copied()
            .unwrap_or_else(|| self.default_fee.load(Ordering::SeqCst)))
    }

    fn is_fully_signed(&self, psbts: &[String]) -> Result<bool, BitcoinError> {
        for psbt in psbts {
            self.check(psbt)?;
        }
        let distinct: HashSet<&String> = psbts.iter().collect();
        Ok(!distinct.is_empty() && distinct.len() >= self.threshold.load(Ordering::SeqCst))
    }

    fn to_descriptor(&self, miniscript: &str) -> Result<String, BitcoinError> {
        if miniscript.is_empty() {
            return Err(BitcoinError::InvalidMiniscript("empty".into()));
        }
        Ok(format!("wsh({miniscript})"))
    }

    fn to_miniscript(&self, descriptor: &str) -> Result<String, BitcoinError> {
        descriptor
            .strip_prefix("wsh(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(str::to_string)
            .ok_or_else(|| BitcoinError::InvalidDescriptor(descriptor.to_string()))
    }

    fn tx_id(&self, tx: &str) -> Result<String, BitcoinError> {
        if tx.is_empty() {
            return Err(BitcoinError::InvalidTransaction("empty".into()));
        }
        Ok(hex::encode(cosign_crypto::blake2b_256(tx.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_threshold_counts_distinct_psbts() {
        let btc = NullBitcoin::new().with_threshold(2);
        assert!(!btc.is_fully_signed(&[]).unwrap());
        assert!(!btc.is_fully_signed(&["a".into(), "a".into()]).unwrap());
        assert!(btc.is_fully_signed(&["a".into(), "b".into()]).unwrap());
    }

    #[test]
    fn descriptor_round_trip() {
        let btc = NullBitcoin::new();
        let descriptor = btc.to_descriptor("and_v(pk(A),pk(B))").unwrap();
        assert_eq!(btc.to_miniscript(&descriptor).unwrap(), "and_v(pk(A),pk(B))");
        assert!(btc.to_miniscript("tr(x)").is_err());
    }

    #[test]
    fn fees_fall_back_to_default() {
        let btc = NullBitcoin::new();
        btc.set_default_fee(100);
        btc.set_fee("special", 7);
        assert_eq!(btc.fee("special").unwrap(), 7);
        assert_eq!(btc.fee("other").unwrap(), 100);
        btc.mark_invalid("bad");
        assert!(btc.fee("bad").is_err());
    }
}

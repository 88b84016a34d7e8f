//! Fee strategies and signed-size estimation

use crate::constants::*;
use crate::encode::encode_varint;
use crate::error::{MultisigError, Result};
use crate::interfaces::FeeOracle;
use crate::types::{btc_to_satoshis, Amount};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// How the fee for a transaction of a given size is chosen
pub trait FeeStrategy {
    fn fee_for_size(&self, bytes: usize) -> Amount;
}

/// The same absolute fee regardless of size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedFee(pub Amount);

impl FeeStrategy for FixedFee {
    fn fee_for_size(&self, _bytes: usize) -> Amount {
        self.0
    }
}

/// Satoshis per serialized byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeeRate {
    pub sat_per_byte: Amount,
}

impl FeeRate {
    pub fn new(sat_per_byte: Amount) -> Self {
        Self { sat_per_byte }
    }

    /// Convert a node's BTC-per-kilobyte estimate, rounding up to whole sat/byte
    pub fn from_btc_per_kb(btc_per_kb: f64) -> Result<Self> {
        let sat_per_kb = btc_to_satoshis(btc_per_kb)?;
        Ok(Self {
            sat_per_byte: (sat_per_kb + 999) / 1000,
        })
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_FEE_RATE)
    }
}

impl FeeStrategy for FeeRate {
    fn fee_for_size(&self, bytes: usize) -> Amount {
        self.sat_per_byte.saturating_mul(bytes as Amount)
    }
}

/// Length of the prefix that pushes `len` bytes
fn push_prefix_len(len: usize) -> usize {
    match len {
        0..=0x4b => 1,
        0x4c..=0xff => 2,
        _ => 3,
    }
}

/// Upper bound on the signed size of a transaction spending `inputs` P2SH
/// outputs, each unlocked by `m` signatures and a redeem script of
/// `redeem_len` bytes, to `outputs` P2PKH outputs
pub fn estimate_multisig_spend_size(
    inputs: usize,
    outputs: usize,
    m: usize,
    redeem_len: usize,
) -> Result<usize> {
    if m == 0 || m > MAX_PUBKEYS_PER_MULTISIG || redeem_len > MAX_REDEEM_SCRIPT_SIZE {
        return Err(MultisigError::InvalidScript(format!(
            "cannot estimate size of a {}-signature spend of a {} byte redeem script",
            m, redeem_len
        )));
    }

    let script_sig_len =
        1 + m * (1 + MAX_SIGNATURE_WITH_SIGHASH_LEN) + push_prefix_len(redeem_len) + redeem_len;
    let input_len = 32 + 4 + encode_varint(script_sig_len as u64).len() + script_sig_len + 4;
    let output_len = 8 + 1 + 25;

    Ok(4 + encode_varint(inputs as u64).len()
        + inputs * input_len
        + encode_varint(outputs as u64).len()
        + outputs * output_len
        + 4)
}

/// Ask the oracle for a rate, using `fallback` when it has no answer
pub fn resolve_fee_rate<O: FeeOracle + ?Sized>(oracle: &O, target_blocks: u16, fallback: FeeRate) -> FeeRate {
    match oracle.estimate_fee_rate(target_blocks) {
        Ok(rate) => {
            debug!("fee oracle: {} sat/byte for {} blocks", rate.sat_per_byte, target_blocks);
            rate
        }
        Err(e) => {
            warn!(
                "fee estimation failed ({}), falling back to {} sat/byte",
                e, fallback.sat_per_byte
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<FeeRate>);

    impl FeeOracle for Fixed {
        fn estimate_fee_rate(&self, _target_blocks: u16) -> anyhow::Result<FeeRate> {
            self.0.ok_or_else(|| anyhow::anyhow!("no estimate"))
        }
    }

    #[test]
    fn test_fixed_fee_ignores_size() {
        assert_eq!(FixedFee(500).fee_for_size(10), 500);
        assert_eq!(FixedFee(500).fee_for_size(10_000), 500);
    }

    #[test]
    fn test_fee_rate_scales() {
        assert_eq!(FeeRate::new(3).fee_for_size(250), 750);
        assert_eq!(FeeRate::new(u64::MAX).fee_for_size(2), u64::MAX);
    }

    #[test]
    fn test_from_btc_per_kb_rounds_up() {
        assert_eq!(FeeRate::from_btc_per_kb(0.00001).unwrap().sat_per_byte, 1);
        assert_eq!(FeeRate::from_btc_per_kb(0.00001001).unwrap().sat_per_byte, 2);
        assert!(FeeRate::from_btc_per_kb(-1.0).is_err());
    }

    #[test]
    fn test_estimate_two_of_three() {
        // scriptSig: 1 + 2 * 74 + 2 + 105 = 256, varint 3 bytes
        let expected = 4 + 1 + (32 + 4 + 3 + 256 + 4) + 1 + 34 + 4;
        assert_eq!(estimate_multisig_spend_size(1, 1, 2, 105).unwrap(), expected);
        assert!(estimate_multisig_spend_size(1, 1, 0, 105).is_err());
        assert!(estimate_multisig_spend_size(1, 1, 2, MAX_REDEEM_SCRIPT_SIZE + 1).is_err());
    }

    #[test]
    fn test_estimate_uncompressed_two_of_three() {
        // Redeem script: 3 + 3 * 66 = 201 bytes, scriptSig 1 + 2 * 74 + 2 + 201 = 352
        let redeem_len = 3 + 3 * (1 + UNCOMPRESSED_PUBKEY_LEN);
        let expected = 4 + 1 + (32 + 4 + 3 + 352 + 4) + 1 + 34 + 4;
        assert_eq!(estimate_multisig_spend_size(1, 1, 2, redeem_len).unwrap(), expected);
    }

    #[test]
    fn test_resolve_fee_rate_fallback() {
        let fallback = FeeRate::default();
        assert_eq!(resolve_fee_rate(&Fixed(Some(FeeRate::new(12))), 6, fallback), FeeRate::new(12));
        assert_eq!(resolve_fee_rate(&Fixed(None), 6, fallback), fallback);
    }
}

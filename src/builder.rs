//! Unsigned spend assembly
//!
//! All UTXOs are swept into a single P2PKH output; there is no change output.

use crate::address::{p2pkh_hash160, Address};
use crate::error::{MultisigError, Result};
use crate::fee::{estimate_multisig_spend_size, FeeStrategy};
use crate::network::Network;
use crate::script::{multisig_params, p2pkh_script, Script};
use crate::types::*;
use log::debug;

/// Checked sum of UTXO amounts
pub fn total_amount(utxos: &[Utxo]) -> Result<Amount> {
    utxos.iter().try_fold(0u64, |total, utxo| {
        total
            .checked_add(utxo.amount)
            .ok_or_else(|| MultisigError::InvalidAmount("UTXO total overflows".to_string()))
    })
}

/// One empty-scriptSig input per UTXO and one P2PKH output of `Σ amounts - fee`
pub fn build_unsigned(
    utxos: &[Utxo],
    fee: Amount,
    destination: &Address,
    network: Network,
) -> Result<Transaction> {
    let available = total_amount(utxos)?;
    let value = match available.checked_sub(fee) {
        Some(value) if value > 0 && !utxos.is_empty() => value,
        _ => return Err(MultisigError::InsufficientFunds { available, fee }),
    };

    let hash = p2pkh_hash160(destination, network)?;
    let inputs = utxos
        .iter()
        .map(|utxo| TransactionInput::new(utxo.outpoint.clone()))
        .collect();
    let outputs = vec![TransactionOutput {
        value,
        script_pubkey: p2pkh_script(&hash).into_bytes(),
    }];

    debug!(
        "assembled {} inputs ({} sat) paying {} sat to {} with fee {}",
        utxos.len(),
        available,
        value,
        destination,
        fee
    );
    Ok(Transaction::new(inputs, outputs))
}

/// [`build_unsigned`] with the fee chosen by `strategy` from the estimated
/// signed size of spending `utxos` through `redeem_script`
pub fn build_unsigned_with_strategy<S: FeeStrategy + ?Sized>(
    utxos: &[Utxo],
    strategy: &S,
    redeem_script: &Script,
    destination: &Address,
    network: Network,
) -> Result<Transaction> {
    let (m, _) = multisig_params(redeem_script)?;
    let size = estimate_multisig_spend_size(utxos.len(), 1, m, redeem_script.len())?;
    let fee = strategy.fee_for_size(size);
    debug!("estimated signed size {} bytes, fee {} sat", size, fee);
    build_unsigned(utxos, fee, destination, network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::{FeeRate, FixedFee};
    use crate::keys::PrivateKey;
    use crate::script::multisig_redeem_script;
    use crate::signer::sign_all_inputs;
    use crate::transaction::transaction_size;

    const DESTINATION: &str = "mz8AXDhDMhvLs7kxwfQxvcH5GoVH6AdARZ";

    fn utxo(byte: u8, amount: Amount) -> Utxo {
        Utxo {
            outpoint: OutPoint { txid: [byte; 32], vout: 0 },
            amount,
        }
    }

    #[test]
    fn test_single_output_after_fee() {
        let tx = build_unsigned(&[utxo(1, 100_000)], 1_000, &Address::new(DESTINATION), Network::Regtest)
            .unwrap();
        assert_eq!(tx.inputs.len(), 1);
        assert!(tx.inputs[0].script_sig.is_empty());
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, 99_000);
        assert!(Script::from_bytes(tx.outputs[0].script_pubkey.clone()).is_p2pkh());
    }

    #[test]
    fn test_fee_consumes_everything() {
        for fee in [100_000, 150_000] {
            let result =
                build_unsigned(&[utxo(1, 100_000)], fee, &Address::new(DESTINATION), Network::Regtest);
            assert!(matches!(
                result,
                Err(MultisigError::InsufficientFunds { available: 100_000, .. })
            ));
        }
    }

    #[test]
    fn test_empty_utxo_list() {
        let result = build_unsigned(&[], 0, &Address::new(DESTINATION), Network::Regtest);
        assert!(matches!(result, Err(MultisigError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_sum_overflow() {
        let utxos = [utxo(1, u64::MAX), utxo(2, 1)];
        assert!(matches!(total_amount(&utxos), Err(MultisigError::InvalidAmount(_))));
    }

    #[test]
    fn test_destination_must_be_p2pkh_on_network() {
        let result = build_unsigned(
            &[utxo(1, 100_000)],
            1_000,
            &Address::new("2MuXogRGTh7uADB2wKBqFcsPTprVKnChJe6"),
            Network::Regtest,
        );
        assert!(matches!(result, Err(MultisigError::InvalidAddress(_))));

        let result =
            build_unsigned(&[utxo(1, 100_000)], 1_000, &Address::new(DESTINATION), Network::Mainnet);
        assert!(matches!(result, Err(MultisigError::InvalidAddress(_))));
    }

    #[test]
    fn test_inputs_follow_utxo_order() {
        let tx = build_unsigned(
            &[utxo(1, 10_000), utxo(2, 20_000)],
            500,
            &Address::new(DESTINATION),
            Network::Regtest,
        )
        .unwrap();
        assert_eq!(tx.inputs[0].prevout.txid, [1; 32]);
        assert_eq!(tx.inputs[1].prevout.txid, [2; 32]);
        assert_eq!(tx.outputs[0].value, 29_500);
    }

    #[test]
    fn test_with_strategy() {
        let pubkeys: Vec<_> = [0x11u8, 0x22, 0x33]
            .iter()
            .map(|b| PrivateKey::from_slice(&[*b; 32]).unwrap().public_key())
            .collect();
        let redeem = multisig_redeem_script(2, &pubkeys).unwrap();
        let destination = Address::new(DESTINATION);

        let fixed =
            build_unsigned_with_strategy(&[utxo(1, 50_000)], &FixedFee(500), &redeem, &destination, Network::Regtest)
                .unwrap();
        assert_eq!(fixed.outputs[0].value, 49_500);

        let size = estimate_multisig_spend_size(1, 1, 2, redeem.len()).unwrap() as u64;
        let rated = build_unsigned_with_strategy(
            &[utxo(1, 50_000)],
            &FeeRate::new(2),
            &redeem,
            &destination,
            Network::Regtest,
        )
        .unwrap();
        assert_eq!(rated.outputs[0].value, 50_000 - 2 * size);
    }

    #[test]
    fn test_uncompressed_keys_pay_full_rate() {
        let keys: Vec<PrivateKey> = [0x11u8, 0x22, 0x33]
            .iter()
            .map(|b| PrivateKey::from_slice(&[*b; 32]).unwrap().into_uncompressed())
            .collect();
        let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let redeem = multisig_redeem_script(2, &pubkeys).unwrap();
        assert_eq!(redeem.len(), 201);

        let unsigned = build_unsigned_with_strategy(
            &[utxo(1, 100_000)],
            &FeeRate::new(1),
            &redeem,
            &Address::new(DESTINATION),
            Network::Regtest,
        )
        .unwrap();
        let signed = sign_all_inputs(&unsigned, &redeem, &keys[..2]).unwrap();

        let fee = 100_000 - signed.outputs[0].value;
        assert!(fee >= transaction_size(&signed) as u64);
    }
}

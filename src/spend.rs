//! End-to-end sweep of a P2SH multisig address
//!
//! list unspent → fee → assemble → sign → check → test-accept → broadcast.
//! All I/O goes through the traits in [`crate::interfaces`].

use crate::address::{p2sh_address, Address};
use crate::builder::build_unsigned_with_strategy;
use crate::config::SpendConfig;
use crate::crypto::hash160;
use crate::error::Result;
use crate::fee::resolve_fee_rate;
use crate::interfaces::{BroadcastSink, FeeOracle, UtxoSource};
use crate::interpreter::check_input;
use crate::keys::PrivateKey;
use crate::script::{p2sh_script, Script};
use crate::signer::{order_keys_by_script, sign_all_inputs_with_sighash};
use crate::transaction::{check_transaction, serialize_hex, txid_hex};
use log::{info, warn};

/// What to spend and where to send it
#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub redeem_script: Script,
    /// Exactly `m` keys from the redeem script, in any order
    pub signing_keys: Vec<PrivateKey>,
    pub destination: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendOutcome {
    /// The P2SH address holds no spendable outputs
    NothingToSpend,
    /// The node refused the signed transaction; nothing was broadcast
    Rejected {
        txid: String,
        raw_tx: String,
        reason: String,
    },
    Broadcast { txid: String, raw_tx: String },
}

pub fn spend_p2sh_multisig<U, F, B>(
    config: &SpendConfig,
    request: SpendRequest,
    utxo_source: &U,
    fee_oracle: &F,
    sink: &B,
) -> Result<SpendOutcome>
where
    U: UtxoSource + ?Sized,
    F: FeeOracle + ?Sized,
    B: BroadcastSink + ?Sized,
{
    config.validate()?;
    let network = config.network;

    let source = p2sh_address(&request.redeem_script, network);
    let utxos = utxo_source.list_unspent(
        &source,
        config.min_confirmations,
        config.max_confirmations,
    )?;
    if utxos.is_empty() {
        info!("no unspent outputs at {}", source);
        return Ok(SpendOutcome::NothingToSpend);
    }
    info!("found {} unspent outputs at {}", utxos.len(), source);

    let rate = resolve_fee_rate(fee_oracle, config.fee_target_blocks, config.fallback_fee_rate);
    let unsigned = build_unsigned_with_strategy(
        &utxos,
        &rate,
        &request.redeem_script,
        &request.destination,
        network,
    )?;

    let keys = order_keys_by_script(&request.redeem_script, request.signing_keys)?;
    let signed = sign_all_inputs_with_sighash(&unsigned, &request.redeem_script, &keys, config.sighash)?;

    check_transaction(&signed)?;
    let script_pubkey = p2sh_script(&hash160(request.redeem_script.as_bytes()));
    for input_index in 0..signed.inputs.len() {
        check_input(&signed, input_index, &script_pubkey)?;
    }

    let raw_tx = serialize_hex(&signed);
    let txid = txid_hex(&signed);

    let acceptance = sink.test_accept(&raw_tx)?;
    if !acceptance.allowed {
        let reason = acceptance.reject_reason.unwrap_or_default();
        warn!("transaction {} rejected by mempool: {}", txid, reason);
        return Ok(SpendOutcome::Rejected {
            txid,
            raw_tx,
            reason,
        });
    }

    let node_txid = sink.send_raw_transaction(&raw_tx)?;
    if node_txid != txid {
        warn!("node reported txid {} for transaction {}", node_txid, txid);
    }
    info!("broadcast {} paying {}", txid, request.destination);
    Ok(SpendOutcome::Broadcast { txid, raw_tx })
}

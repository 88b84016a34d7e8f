//! Transaction serialization, txid and legacy signature hashing

use crate::constants::*;
use crate::crypto::double_sha256;
use crate::encode::{encode_varint, write_var_bytes, Decoder};
use crate::error::{MultisigError, Result};
use crate::script::Script;
use crate::types::*;

/// Serialize(tx) = version ‖ |ins| ‖ ins ‖ |outs| ‖ outs ‖ lock_time
///
/// Each input is the reversed txid, vout, length-prefixed scriptSig and
/// sequence; each output is the value and length-prefixed scriptPubKey.
pub fn serialize_transaction(tx: &Transaction) -> ByteString {
    let mut out = Vec::with_capacity(transaction_size_hint(tx));
    out.extend_from_slice(&tx.version.to_le_bytes());

    out.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        let mut txid = input.prevout.txid;
        txid.reverse();
        out.extend_from_slice(&txid);
        out.extend_from_slice(&input.prevout.vout.to_le_bytes());
        write_var_bytes(&mut out, &input.script_sig);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }

    out.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        out.extend_from_slice(&output.value.to_le_bytes());
        write_var_bytes(&mut out, &output.script_pubkey);
    }

    out.extend_from_slice(&tx.lock_time.to_le_bytes());
    out
}

/// Inverse of [`serialize_transaction`]; trailing bytes are an error
pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction> {
    let mut decoder = Decoder::new(bytes);
    let version = decoder.read_u32_le()?;

    // Smallest input is 41 bytes, smallest output 9 bytes
    let input_count = decoder.read_varint()?;
    if input_count > (decoder.remaining() / 41) as u64 {
        return Err(MultisigError::Serialization(format!(
            "input count {} exceeds available data",
            input_count
        )));
    }
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let mut txid: Hash = decoder.read_array()?;
        txid.reverse();
        let vout = decoder.read_u32_le()?;
        let script_sig = decoder.read_var_bytes()?;
        let sequence = decoder.read_u32_le()?;
        inputs.push(TransactionInput {
            prevout: OutPoint { txid, vout },
            script_sig,
            sequence,
        });
    }

    let output_count = decoder.read_varint()?;
    if output_count > (decoder.remaining() / 9) as u64 {
        return Err(MultisigError::Serialization(format!(
            "output count {} exceeds available data",
            output_count
        )));
    }
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        let value = decoder.read_u64_le()?;
        let script_pubkey = decoder.read_var_bytes()?;
        outputs.push(TransactionOutput {
            value,
            script_pubkey,
        });
    }

    let lock_time = decoder.read_u32_le()?;
    decoder.finish()?;

    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

pub fn serialize_hex(tx: &Transaction) -> String {
    hex::encode(serialize_transaction(tx))
}

pub fn deserialize_hex(raw_tx: &str) -> Result<Transaction> {
    let bytes = hex::decode(raw_tx.trim())
        .map_err(|e| MultisigError::Serialization(format!("transaction hex: {}", e)))?;
    deserialize_transaction(&bytes)
}

/// SHA256(SHA256(Serialize(tx))), byte-reversed for display
pub fn calculate_txid(tx: &Transaction) -> Hash {
    let mut txid = double_sha256(&serialize_transaction(tx));
    txid.reverse();
    txid
}

pub fn txid_hex(tx: &Transaction) -> String {
    hex::encode(calculate_txid(tx))
}

/// Exact serialized size in bytes
pub fn transaction_size(tx: &Transaction) -> usize {
    serialize_transaction(tx).len()
}

fn transaction_size_hint(tx: &Transaction) -> usize {
    let inputs: usize = tx.inputs.iter().map(|i| 41 + i.script_sig.len() + 2).sum();
    let outputs: usize = tx.outputs.iter().map(|o| 9 + o.script_pubkey.len() + 2).sum();
    10 + inputs + outputs
}

/// Legacy (pre-segwit) signature digest for one input.
///
/// The transaction is copied, every scriptSig is blanked and the signed
/// input's scriptSig is replaced by `script_code` (the redeem script for P2SH).
/// NONE drops all outputs, SINGLE keeps only the output at `input_index` with
/// earlier outputs nulled, and both zero the other inputs' sequences.
/// ANYONECANPAY keeps only the signed input. The LE32 sighash type is appended
/// and the result double-SHA256 hashed.
pub fn signing_digest(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sighash_type: SighashType,
) -> Result<Hash> {
    if input_index >= tx.inputs.len() {
        return Err(MultisigError::InputIndexOutOfRange {
            index: input_index,
            count: tx.inputs.len(),
        });
    }

    let base = sighash_type.base();
    if base == SighashType::SINGLE.base() && input_index >= tx.outputs.len() {
        // Historical consensus quirk: the digest is the integer one
        let mut one = [0u8; 32];
        one[0] = 1;
        return Ok(one);
    }

    let zero_other_sequences =
        base == SighashType::NONE.base() || base == SighashType::SINGLE.base();

    let mut tx_copy = tx.clone();
    for (i, input) in tx_copy.inputs.iter_mut().enumerate() {
        if i == input_index {
            input.script_sig = script_code.as_bytes().to_vec();
        } else {
            input.script_sig.clear();
            if zero_other_sequences {
                input.sequence = 0;
            }
        }
    }

    if base == SighashType::NONE.base() {
        tx_copy.outputs.clear();
    } else if base == SighashType::SINGLE.base() {
        tx_copy.outputs.truncate(input_index + 1);
        for output in tx_copy.outputs.iter_mut().take(input_index) {
            output.value = u64::MAX;
            output.script_pubkey.clear();
        }
    }

    if sighash_type.is_anyone_can_pay() {
        let signed = tx_copy.inputs.swap_remove(input_index);
        tx_copy.inputs = vec![signed];
    }

    let mut preimage = serialize_transaction(&tx_copy);
    preimage.extend_from_slice(&sighash_type.to_u32().to_le_bytes());
    Ok(double_sha256(&preimage))
}

/// CheckTransaction: structural sanity before handing a transaction to a node
///
/// 1. |ins| > 0 ∧ |outs| > 0
/// 2. ∀o ∈ outs: o.value ≤ M_max, and Σ o.value ≤ M_max
pub fn check_transaction(tx: &Transaction) -> Result<()> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(MultisigError::Serialization(
            "transaction needs at least one input and one output".to_string(),
        ));
    }

    let mut total: u64 = 0;
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value > MAX_MONEY {
            return Err(MultisigError::InvalidAmount(format!(
                "output {} value {} exceeds the money supply",
                i, output.value
            )));
        }
        total = total
            .checked_add(output.value)
            .filter(|total| *total <= MAX_MONEY)
            .ok_or_else(|| {
                MultisigError::InvalidAmount("total output value out of range".to_string())
            })?;
    }
    Ok(())
}

//! Multisig signing
//!
//! Signatures are produced in the order keys are supplied. CHECKMULTISIG
//! consumes keys in redeem-script order without backtracking, so callers must
//! pass keys in that order (see [`order_keys_by_script`]).

use crate::error::{MultisigError, Result};
use crate::keys::PrivateKey;
use crate::script::{build, multisig_params, Opcode, Script, ScriptElement};
use crate::transaction::signing_digest;
use crate::types::*;
use log::debug;

/// DER signature over the input's legacy digest with the sighash byte appended
pub fn create_signature(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    key: &PrivateKey,
    sighash_type: SighashType,
) -> Result<ByteString> {
    let digest = signing_digest(tx, input_index, script_code, sighash_type)?;
    let mut signature = key.sign_digest(&digest)?;
    signature.push(sighash_type.to_byte());
    Ok(signature)
}

/// `OP_0 <sig1> … <sigm> <redeem script>`
///
/// The leading `OP_0` is the dummy element CHECKMULTISIG pops.
pub fn multisig_unlocking_script(signatures: &[ByteString], redeem_script: &Script) -> Result<Script> {
    let mut elements = Vec::with_capacity(signatures.len() + 2);
    elements.push(ScriptElement::Op(Opcode::Num(0)));
    elements.extend(signatures.iter().map(ScriptElement::push));
    elements.push(ScriptElement::push(redeem_script.as_bytes()));
    build(&elements)
}

/// Sign one P2SH multisig input with SIGHASH_ALL
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    redeem_script: &Script,
    keys: &[PrivateKey],
) -> Result<Transaction> {
    sign_input_with_sighash(tx, input_index, redeem_script, keys, SighashType::ALL)
}

/// Sign one P2SH multisig input.
///
/// Exactly `m` keys are required, in redeem-script order. Only the scriptSig
/// of `input_index` differs between the returned transaction and `tx`.
pub fn sign_input_with_sighash(
    tx: &Transaction,
    input_index: usize,
    redeem_script: &Script,
    keys: &[PrivateKey],
    sighash_type: SighashType,
) -> Result<Transaction> {
    if input_index >= tx.inputs.len() {
        return Err(MultisigError::InputIndexOutOfRange {
            index: input_index,
            count: tx.inputs.len(),
        });
    }

    let (required, _) = multisig_params(redeem_script)?;
    if keys.len() != required {
        return Err(MultisigError::ThresholdMismatch {
            required,
            provided: keys.len(),
        });
    }

    let signatures = keys
        .iter()
        .map(|key| create_signature(tx, input_index, redeem_script, key, sighash_type))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "signed input {} with {} signatures (sighash 0x{:02x})",
        input_index,
        signatures.len(),
        sighash_type.to_byte()
    );

    let script_sig = multisig_unlocking_script(&signatures, redeem_script)?;
    let mut signed = tx.clone();
    signed.inputs[input_index].script_sig = script_sig.into_bytes();
    Ok(signed)
}

/// Sign every input against the same redeem script with SIGHASH_ALL
pub fn sign_all_inputs(
    tx: &Transaction,
    redeem_script: &Script,
    keys: &[PrivateKey],
) -> Result<Transaction> {
    sign_all_inputs_with_sighash(tx, redeem_script, keys, SighashType::ALL)
}

pub fn sign_all_inputs_with_sighash(
    tx: &Transaction,
    redeem_script: &Script,
    keys: &[PrivateKey],
    sighash_type: SighashType,
) -> Result<Transaction> {
    // Signing digests blank every other scriptSig, so earlier signatures stay valid
    let mut signed = tx.clone();
    for input_index in 0..tx.inputs.len() {
        signed = sign_input_with_sighash(&signed, input_index, redeem_script, keys, sighash_type)?;
    }
    Ok(signed)
}

/// Reorder keys to match the order their public keys appear in the redeem script.
///
/// Each script key may be supplied at most once.
pub fn order_keys_by_script(redeem_script: &Script, keys: Vec<PrivateKey>) -> Result<Vec<PrivateKey>> {
    let (_, script_keys) = multisig_params(redeem_script)?;

    let mut positioned = keys
        .into_iter()
        .map(|key| {
            let public_key = key.public_key();
            script_keys
                .iter()
                .position(|candidate| candidate.as_slice() == public_key.as_bytes())
                .map(|position| (position, key))
                .ok_or_else(|| MultisigError::KeyNotInScript(public_key.to_hex()))
        })
        .collect::<Result<Vec<_>>>()?;

    positioned.sort_by_key(|(position, _)| *position);
    if let Some(pair) = positioned.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(MultisigError::DuplicateKey(pair[0].1.public_key().to_hex()));
    }
    Ok(positioned.into_iter().map(|(_, key)| key).collect())
}

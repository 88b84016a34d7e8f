//! Minimal script execution for checking P2SH multisig and P2PKH spends
//!
//! Only the opcodes these templates use are executed; anything else fails the
//! script. Signatures are checked against the legacy signing digest of the
//! input being verified.

use crate::constants::*;
use crate::crypto::{double_sha256, hash160};
use crate::error::{MultisigError, Result};
use crate::script::{Opcode, Script, ScriptElement};
use crate::transaction::signing_digest;
use crate::types::*;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, VerifyOnly};

/// Verifies signatures for one input of one transaction
pub struct SignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    secp: Secp256k1<VerifyOnly>,
}

impl<'a> SignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize) -> Self {
        Self {
            tx,
            input_index,
            secp: Secp256k1::verification_only(),
        }
    }

    /// `signature` is DER followed by the sighash byte
    pub fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &Script) -> bool {
        let Some((&sighash_byte, der)) = signature.split_last() else {
            return false;
        };
        let Ok(sighash_type) = SighashType::from_u32(sighash_byte as u32) else {
            return false;
        };
        let Ok(digest) = signing_digest(self.tx, self.input_index, script_code, sighash_type)
        else {
            return false;
        };
        verify_signature(&self.secp, pubkey, der, &digest)
    }
}

/// Verify a DER signature over `digest` with secp256k1
fn verify_signature(
    secp: &Secp256k1<VerifyOnly>,
    pubkey_bytes: &[u8],
    der: &[u8],
    digest: &Hash,
) -> bool {
    let pubkey = match PublicKey::from_slice(pubkey_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    let mut signature = match Signature::from_der(der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    signature.normalize_s();

    let message = match Message::from_digest_slice(digest) {
        Ok(msg) => msg,
        Err(_) => return false,
    };

    secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
}

/// Run `script` against `stack`.
///
/// Returns `Ok(false)` when execution fails and `Err` for malformed scripts or
/// exceeded resource limits. `script_code` is what signatures commit to.
pub fn eval_script(
    script: &Script,
    stack: &mut Vec<ByteString>,
    checker: &SignatureChecker,
    script_code: &Script,
) -> Result<bool> {
    let mut op_count = 0;

    for element in script.elements()? {
        if matches!(element, ScriptElement::Op(op) if !matches!(op, Opcode::Num(_))) {
            op_count += 1;
            if op_count > MAX_SCRIPT_OPS {
                return Err(MultisigError::InvalidScript(
                    "Operation limit exceeded".to_string(),
                ));
            }
        }

        if !execute_element(element, stack, checker, script_code)? {
            return Ok(false);
        }

        if stack.len() > MAX_STACK_SIZE {
            return Err(MultisigError::InvalidScript("Stack overflow".to_string()));
        }
    }

    Ok(true)
}

fn execute_element(
    element: ScriptElement,
    stack: &mut Vec<ByteString>,
    checker: &SignatureChecker,
    script_code: &Script,
) -> Result<bool> {
    let op = match element {
        ScriptElement::Push(data) => {
            if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Ok(false);
            }
            stack.push(data);
            return Ok(true);
        }
        ScriptElement::Op(op) => op,
    };

    match op {
        // OP_0 pushes an empty array, OP_1..OP_16 push their number
        Opcode::Num(0) => {
            stack.push(vec![]);
            Ok(true)
        }
        Opcode::Num(n) => {
            stack.push(vec![n]);
            Ok(true)
        }

        Opcode::Dup => {
            if let Some(item) = stack.last().cloned() {
                stack.push(item);
                Ok(true)
            } else {
                Ok(false)
            }
        }

        Opcode::Drop => Ok(stack.pop().is_some()),

        // RIPEMD160(SHA256(x))
        Opcode::Hash160 => {
            if let Some(item) = stack.pop() {
                stack.push(hash160(&item).to_vec());
                Ok(true)
            } else {
                Ok(false)
            }
        }

        // SHA256(SHA256(x))
        Opcode::Hash256 => {
            if let Some(item) = stack.pop() {
                stack.push(double_sha256(&item).to_vec());
                Ok(true)
            } else {
                Ok(false)
            }
        }

        Opcode::Equal | Opcode::EqualVerify => {
            let (Some(a), Some(b)) = (stack.pop(), stack.pop()) else {
                return Ok(false);
            };
            if op == Opcode::EqualVerify {
                return Ok(a == b);
            }
            stack.push(if a == b { vec![1] } else { vec![] });
            Ok(true)
        }

        Opcode::Verify => match stack.pop() {
            Some(item) => Ok(cast_to_bool(&item)),
            None => Ok(false),
        },

        Opcode::CheckSig | Opcode::CheckSigVerify => {
            let (Some(pubkey), Some(signature)) = (stack.pop(), stack.pop()) else {
                return Ok(false);
            };
            let valid = checker.check_sig(&signature, &pubkey, script_code);
            if op == Opcode::CheckSigVerify {
                return Ok(valid);
            }
            stack.push(if valid { vec![1] } else { vec![] });
            Ok(true)
        }

        Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify => {
            let Some(valid) = check_multisig(stack, checker, script_code) else {
                return Ok(false);
            };
            if op == Opcode::CheckMultiSigVerify {
                return Ok(valid);
            }
            stack.push(if valid { vec![1] } else { vec![] });
            Ok(true)
        }

        Opcode::Return | Opcode::Other(_) => Ok(false),
    }
}

/// Pop `<dummy> <sigs…> m <keys…> n` and match signatures to keys.
///
/// Keys are consumed in script order and never revisited, so signatures must
/// appear in the same relative order as their keys. Returns `None` if the
/// stack does not hold a well-formed multisig argument list.
fn check_multisig(
    stack: &mut Vec<ByteString>,
    checker: &SignatureChecker,
    script_code: &Script,
) -> Option<bool> {
    let n = decode_small_num(&stack.pop()?)?;
    if n > MAX_PUBKEYS_PER_MULTISIG || stack.len() < n {
        return None;
    }
    let keys = stack.split_off(stack.len() - n);

    let m = decode_small_num(&stack.pop()?)?;
    if m > n || stack.len() < m + 1 {
        return None;
    }
    let signatures = stack.split_off(stack.len() - m);

    // The extra element consumed by CHECKMULTISIG must be empty
    if !stack.pop()?.is_empty() {
        return None;
    }

    let mut isig = 0;
    let mut ikey = 0;
    while isig < signatures.len() {
        if signatures.len() - isig > keys.len() - ikey {
            return Some(false);
        }
        if checker.check_sig(&signatures[isig], &keys[ikey], script_code) {
            isig += 1;
        }
        ikey += 1;
    }
    Some(true)
}

/// Minimally encoded non-negative script number up to 4 bytes
fn decode_small_num(item: &[u8]) -> Option<usize> {
    if item.len() > 4 {
        return None;
    }
    let mut value: u32 = 0;
    for (i, byte) in item.iter().enumerate() {
        value |= (*byte as u32) << (8 * i);
    }
    if let Some(last) = item.last() {
        if last & 0x80 != 0 {
            return None;
        }
    }
    Some(value as usize)
}

/// Any non-zero byte makes an item true, except negative zero
fn cast_to_bool(item: &[u8]) -> bool {
    for (i, byte) in item.iter().enumerate() {
        if *byte != 0 {
            return !(i == item.len() - 1 && *byte == 0x80);
        }
    }
    false
}

/// VerifyInput: run scriptSig, then scriptPubKey, then for P2SH the redeem
/// script taken from the top of the scriptSig stack.
pub fn verify_input(tx: &Transaction, input_index: usize, script_pubkey: &Script) -> Result<bool> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(MultisigError::InputIndexOutOfRange {
            index: input_index,
            count: tx.inputs.len(),
        })?;
    let script_sig = Script::from_bytes(input.script_sig.clone());
    let checker = SignatureChecker::new(tx, input_index);

    if script_pubkey.is_p2sh() && !script_sig.is_push_only() {
        return Ok(false);
    }

    let mut stack = Vec::new();
    if !eval_script(&script_sig, &mut stack, &checker, &script_sig)? {
        return Ok(false);
    }
    let mut p2sh_stack = stack.clone();

    if !eval_script(script_pubkey, &mut stack, &checker, script_pubkey)? {
        return Ok(false);
    }
    if !stack.last().map_or(false, |top| cast_to_bool(top)) {
        return Ok(false);
    }

    if script_pubkey.is_p2sh() {
        let Some(serialized) = p2sh_stack.pop() else {
            return Ok(false);
        };
        let redeem_script = Script::from_bytes(serialized);
        if !eval_script(&redeem_script, &mut p2sh_stack, &checker, &redeem_script)? {
            return Ok(false);
        }
        if !p2sh_stack.last().map_or(false, |top| cast_to_bool(top)) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Like [`verify_input`], but a failed verification is a `SignatureMismatch`
pub fn check_input(tx: &Transaction, input_index: usize, script_pubkey: &Script) -> Result<()> {
    if verify_input(tx, input_index, script_pubkey)? {
        Ok(())
    } else {
        Err(MultisigError::SignatureMismatch(input_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{build, p2pkh_script, p2sh_script};

    fn empty_tx() -> Transaction {
        Transaction::new(
            vec![TransactionInput::new(OutPoint { txid: [7; 32], vout: 0 })],
            vec![TransactionOutput {
                value: 1000,
                script_pubkey: vec![0x51],
            }],
        )
    }

    fn run(elements: &[ScriptElement]) -> (bool, Vec<ByteString>) {
        let tx = empty_tx();
        let checker = SignatureChecker::new(&tx, 0);
        let script = build(elements).unwrap();
        let mut stack = Vec::new();
        let ok = eval_script(&script, &mut stack, &checker, &script).unwrap();
        (ok, stack)
    }

    #[test]
    fn test_op_1_to_op_16() {
        for i in 1..=16u8 {
            let (ok, stack) = run(&[ScriptElement::Op(Opcode::Num(i))]);
            assert!(ok);
            assert_eq!(stack, vec![vec![i]]);
        }
    }

    #[test]
    fn test_op_0_pushes_empty() {
        let (ok, stack) = run(&[ScriptElement::Op(Opcode::Num(0))]);
        assert!(ok);
        assert!(stack[0].is_empty());
    }

    #[test]
    fn test_op_dup_empty_stack() {
        let (ok, _) = run(&[ScriptElement::Op(Opcode::Dup)]);
        assert!(!ok);
    }

    #[test]
    fn test_op_hash160() {
        let (ok, stack) = run(&[ScriptElement::push(b"abc"), ScriptElement::Op(Opcode::Hash160)]);
        assert!(ok);
        assert_eq!(stack[0], hash160(b"abc").to_vec());
    }

    #[test]
    fn test_op_equal() {
        let (ok, stack) = run(&[
            ScriptElement::Op(Opcode::Num(1)),
            ScriptElement::Op(Opcode::Num(1)),
            ScriptElement::Op(Opcode::Equal),
        ]);
        assert!(ok);
        assert_eq!(stack, vec![vec![1]]);
    }

    #[test]
    fn test_op_equalverify_false() {
        let (ok, _) = run(&[
            ScriptElement::Op(Opcode::Num(1)),
            ScriptElement::Op(Opcode::Num(2)),
            ScriptElement::Op(Opcode::EqualVerify),
        ]);
        assert!(!ok);
    }

    #[test]
    fn test_op_return_fails() {
        let (ok, _) = run(&[ScriptElement::Op(Opcode::Return)]);
        assert!(!ok);
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let tx = empty_tx();
        let checker = SignatureChecker::new(&tx, 0);
        let script = Script::from_bytes(vec![0x51, 0xb0]);
        let mut stack = Vec::new();
        assert!(!eval_script(&script, &mut stack, &checker, &script).unwrap());
    }

    #[test]
    fn test_operation_count_limit() {
        let tx = empty_tx();
        let checker = SignatureChecker::new(&tx, 0);
        let mut bytes = vec![0x51];
        bytes.extend(std::iter::repeat(0x76).take(MAX_SCRIPT_OPS + 1));
        let script = Script::from_bytes(bytes);
        let mut stack = Vec::new();
        assert!(eval_script(&script, &mut stack, &checker, &script).is_err());
    }

    #[test]
    fn test_checksig_garbage_is_false() {
        let (ok, stack) = run(&[
            ScriptElement::push([0x30u8, 0x01]),
            ScriptElement::push([0x02u8; 33]),
            ScriptElement::Op(Opcode::CheckSig),
        ]);
        assert!(ok);
        assert_eq!(stack, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_checkmultisig_requires_empty_dummy() {
        let tx = empty_tx();
        let checker = SignatureChecker::new(&tx, 0);
        let script = Script::default();
        // dummy=1, no signatures, m=0, one key, n=1
        let mut stack = vec![vec![1], vec![], vec![0x02; 33], vec![1]];
        assert_eq!(check_multisig(&mut stack, &checker, &script), None);

        let mut stack = vec![vec![], vec![], vec![0x02; 33], vec![1]];
        assert_eq!(check_multisig(&mut stack, &checker, &script), Some(true));
    }

    #[test]
    fn test_decode_small_num() {
        assert_eq!(decode_small_num(&[]), Some(0));
        assert_eq!(decode_small_num(&[3]), Some(3));
        assert_eq!(decode_small_num(&[0x81]), None);
        assert_eq!(decode_small_num(&[0, 0, 0, 0, 1]), None);
    }

    #[test]
    fn test_cast_to_bool() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0, 0]));
        assert!(!cast_to_bool(&[0, 0x80]));
        assert!(cast_to_bool(&[1]));
        assert!(cast_to_bool(&[0x80, 0]));
    }

    #[test]
    fn test_p2sh_hash_mismatch_fails() {
        let redeem = Script::from_bytes(vec![0x51]);
        let mut tx = empty_tx();
        tx.inputs[0].script_sig = build(&[ScriptElement::push(redeem.as_bytes())])
            .unwrap()
            .into_bytes();
        assert!(verify_input(&tx, 0, &p2sh_script(&hash160(redeem.as_bytes()))).unwrap());
        assert!(!verify_input(&tx, 0, &p2sh_script(&[0u8; 20])).unwrap());
    }

    #[test]
    fn test_p2sh_rejects_non_push_script_sig() {
        let redeem = Script::from_bytes(vec![0x51]);
        let mut tx = empty_tx();
        tx.inputs[0].script_sig = vec![0x76, 0x01, 0x51];
        assert!(!verify_input(&tx, 0, &p2sh_script(&hash160(redeem.as_bytes()))).unwrap());
    }

    #[test]
    fn test_check_input_maps_to_signature_mismatch() {
        let tx = empty_tx();
        assert!(matches!(
            check_input(&tx, 0, &p2pkh_script(&[0u8; 20])),
            Err(MultisigError::SignatureMismatch(0))
        ));
        assert!(matches!(
            check_input(&tx, 1, &p2pkh_script(&[0u8; 20])),
            Err(MultisigError::InputIndexOutOfRange { .. })
        ));
    }
}

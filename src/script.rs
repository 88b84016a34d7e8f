//! Script construction: opcodes and data pushes to canonical bytes and back

use crate::constants::*;
use crate::error::{MultisigError, Result};
use crate::keys::PublicKey;
use crate::types::{ByteString, Hash160};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcode byte values
pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_VERIFY: u8 = 0x69;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DROP: u8 = 0x75;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_HASH256: u8 = 0xaa;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_CHECKSIGVERIFY: u8 = 0xad;
    pub const OP_CHECKMULTISIG: u8 = 0xae;
    pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
}

use opcodes::*;

/// Named opcodes understood by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// OP_0 through OP_16
    Num(u8),
    Verify,
    Return,
    Drop,
    Dup,
    Equal,
    EqualVerify,
    Hash160,
    Hash256,
    CheckSig,
    CheckSigVerify,
    CheckMultiSig,
    CheckMultiSigVerify,
    /// Any other non-push opcode, carried through parsing untouched
    Other(u8),
}

impl Opcode {
    pub fn to_byte(self) -> Result<u8> {
        Ok(match self {
            Opcode::Num(0) => OP_0,
            Opcode::Num(n @ 1..=16) => OP_1 - 1 + n,
            Opcode::Num(n) => {
                return Err(MultisigError::InvalidScript(format!(
                    "small integer {} outside OP_0..OP_16",
                    n
                )))
            }
            Opcode::Verify => OP_VERIFY,
            Opcode::Return => OP_RETURN,
            Opcode::Drop => OP_DROP,
            Opcode::Dup => OP_DUP,
            Opcode::Equal => OP_EQUAL,
            Opcode::EqualVerify => OP_EQUALVERIFY,
            Opcode::Hash160 => OP_HASH160,
            Opcode::Hash256 => OP_HASH256,
            Opcode::CheckSig => OP_CHECKSIG,
            Opcode::CheckSigVerify => OP_CHECKSIGVERIFY,
            Opcode::CheckMultiSig => OP_CHECKMULTISIG,
            Opcode::CheckMultiSigVerify => OP_CHECKMULTISIGVERIFY,
            Opcode::Other(byte) if (0x01..=OP_PUSHDATA4).contains(&byte) => {
                return Err(MultisigError::InvalidScript(format!(
                    "0x{:02x} is a push opcode, use a data push",
                    byte
                )))
            }
            Opcode::Other(byte) => byte,
        })
    }

    /// Decode a non-push opcode byte
    pub fn from_byte(byte: u8) -> Opcode {
        match byte {
            OP_0 => Opcode::Num(0),
            OP_1..=OP_16 => Opcode::Num(byte - OP_1 + 1),
            OP_VERIFY => Opcode::Verify,
            OP_RETURN => Opcode::Return,
            OP_DROP => Opcode::Drop,
            OP_DUP => Opcode::Dup,
            OP_EQUAL => Opcode::Equal,
            OP_EQUALVERIFY => Opcode::EqualVerify,
            OP_HASH160 => Opcode::Hash160,
            OP_HASH256 => Opcode::Hash256,
            OP_CHECKSIG => Opcode::CheckSig,
            OP_CHECKSIGVERIFY => Opcode::CheckSigVerify,
            OP_CHECKMULTISIG => Opcode::CheckMultiSig,
            OP_CHECKMULTISIGVERIFY => Opcode::CheckMultiSigVerify,
            other => Opcode::Other(other),
        }
    }

    /// Parse a textual opcode name such as `OP_2` or `OP_CHECKMULTISIG`
    pub fn from_name(name: &str) -> Option<Opcode> {
        let upper = name.to_ascii_uppercase();
        let op = match upper.as_str() {
            "OP_0" | "OP_FALSE" => Opcode::Num(0),
            "OP_TRUE" => Opcode::Num(1),
            "OP_VERIFY" => Opcode::Verify,
            "OP_RETURN" => Opcode::Return,
            "OP_DROP" => Opcode::Drop,
            "OP_DUP" => Opcode::Dup,
            "OP_EQUAL" => Opcode::Equal,
            "OP_EQUALVERIFY" => Opcode::EqualVerify,
            "OP_HASH160" => Opcode::Hash160,
            "OP_HASH256" => Opcode::Hash256,
            "OP_CHECKSIG" => Opcode::CheckSig,
            "OP_CHECKSIGVERIFY" => Opcode::CheckSigVerify,
            "OP_CHECKMULTISIG" => Opcode::CheckMultiSig,
            "OP_CHECKMULTISIGVERIFY" => Opcode::CheckMultiSigVerify,
            _ => {
                let n: u8 = upper.strip_prefix("OP_")?.parse().ok()?;
                if n > 16 {
                    return None;
                }
                Opcode::Num(n)
            }
        };
        Some(op)
    }

    pub fn name(self) -> String {
        match self {
            Opcode::Num(n) => format!("OP_{}", n),
            Opcode::Verify => "OP_VERIFY".to_string(),
            Opcode::Return => "OP_RETURN".to_string(),
            Opcode::Drop => "OP_DROP".to_string(),
            Opcode::Dup => "OP_DUP".to_string(),
            Opcode::Equal => "OP_EQUAL".to_string(),
            Opcode::EqualVerify => "OP_EQUALVERIFY".to_string(),
            Opcode::Hash160 => "OP_HASH160".to_string(),
            Opcode::Hash256 => "OP_HASH256".to_string(),
            Opcode::CheckSig => "OP_CHECKSIG".to_string(),
            Opcode::CheckSigVerify => "OP_CHECKSIGVERIFY".to_string(),
            Opcode::CheckMultiSig => "OP_CHECKMULTISIG".to_string(),
            Opcode::CheckMultiSigVerify => "OP_CHECKMULTISIGVERIFY".to_string(),
            Opcode::Other(byte) => format!("OP_UNKNOWN_0x{:02x}", byte),
        }
    }

    fn small_int(self) -> Option<u8> {
        match self {
            Opcode::Num(n) if n <= 16 => Some(n),
            _ => None,
        }
    }
}

/// One element of a script: an opcode or raw data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement {
    Op(Opcode),
    Push(ByteString),
}

impl ScriptElement {
    pub fn push(data: impl AsRef<[u8]>) -> Self {
        ScriptElement::Push(data.as_ref().to_vec())
    }

    pub fn as_push(&self) -> Option<&[u8]> {
        match self {
            ScriptElement::Push(data) => Some(data),
            ScriptElement::Op(_) => None,
        }
    }
}

impl From<Opcode> for ScriptElement {
    fn from(op: Opcode) -> Self {
        ScriptElement::Op(op)
    }
}

/// Serialized script bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script(ByteString);

impl Script {
    /// Wrap raw script bytes without validation
    pub fn from_bytes(bytes: ByteString) -> Self {
        Script(bytes)
    }

    pub fn from_hex(hex_script: &str) -> Result<Self> {
        hex::decode(hex_script.trim())
            .map(Script)
            .map_err(|e| MultisigError::InvalidScript(format!("hex: {}", e)))
    }

    /// Build from textual tokens: opcode names or hex-encoded data pushes
    pub fn from_asm<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let elements = tokens
            .iter()
            .map(|token| {
                let token = token.as_ref().trim();
                if let Some(op) = Opcode::from_name(token) {
                    return Ok(ScriptElement::Op(op));
                }
                hex::decode(token).map(ScriptElement::Push).map_err(|_| {
                    MultisigError::InvalidScript(format!("unknown token '{}'", token))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        build(&elements)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> ByteString {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the bytes back into opcodes and pushes
    pub fn elements(&self) -> Result<Vec<ScriptElement>> {
        let bytes = &self.0;
        let mut elements = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let opcode = bytes[pos];
            pos += 1;
            let len = match opcode {
                0x01..=0x4b => opcode as usize,
                OP_PUSHDATA1 => read_push_len(bytes, &mut pos, 1)?,
                OP_PUSHDATA2 => read_push_len(bytes, &mut pos, 2)?,
                OP_PUSHDATA4 => read_push_len(bytes, &mut pos, 4)?,
                _ => {
                    elements.push(ScriptElement::Op(Opcode::from_byte(opcode)));
                    continue;
                }
            };
            if bytes.len() - pos < len {
                return Err(MultisigError::InvalidScript(format!(
                    "push of {} bytes at offset {} runs past end of script",
                    len,
                    pos - 1
                )));
            }
            elements.push(ScriptElement::Push(bytes[pos..pos + len].to_vec()));
            pos += len;
        }
        Ok(elements)
    }

    /// Human-readable form: opcode names and hex pushes separated by spaces
    pub fn to_asm(&self) -> Result<String> {
        let parts: Vec<String> = self
            .elements()?
            .iter()
            .map(|element| match element {
                ScriptElement::Op(op) => op.name(),
                ScriptElement::Push(data) => hex::encode(data),
            })
            .collect();
        Ok(parts.join(" "))
    }

    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == 0x14 && b[22] == OP_EQUAL
    }

    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == 0x14
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// True if every element is a data push or a small integer
    pub fn is_push_only(&self) -> bool {
        match self.elements() {
            Ok(elements) => elements.iter().all(|element| match element {
                ScriptElement::Push(_) => true,
                ScriptElement::Op(op) => op.small_int().is_some(),
            }),
            Err(_) => false,
        }
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn read_push_len(bytes: &[u8], pos: &mut usize, width: usize) -> Result<usize> {
    if bytes.len() - *pos < width {
        return Err(MultisigError::InvalidScript(
            "truncated push length".to_string(),
        ));
    }
    let mut len = 0usize;
    for (i, byte) in bytes[*pos..*pos + width].iter().enumerate() {
        len |= (*byte as usize) << (8 * i);
    }
    *pos += width;
    Ok(len)
}

/// Append a data push with the shortest length prefix
pub fn push_data(out: &mut ByteString, data: &[u8]) -> Result<()> {
    match data.len() {
        0 => out.push(OP_0),
        len @ 1..=0x4b => out.push(len as u8),
        len @ 0x4c..=0xff => {
            out.push(OP_PUSHDATA1);
            out.push(len as u8);
        }
        len @ 0x100..=MAX_SCRIPT_ELEMENT_SIZE => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        len => {
            return Err(MultisigError::InvalidScript(format!(
                "push of {} bytes exceeds the {} byte limit",
                len, MAX_SCRIPT_ELEMENT_SIZE
            )))
        }
    }
    out.extend_from_slice(data);
    Ok(())
}

/// Encode a sequence of opcodes and pushes.
///
/// Every `OP_CHECKMULTISIG[VERIFY]` must be preceded by `OP_m <n pushes> OP_n`
/// with `1 <= m <= n <= 16`.
pub fn build(elements: &[ScriptElement]) -> Result<Script> {
    let mut bytes = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        match element {
            ScriptElement::Op(op @ (Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify)) => {
                check_multisig_prefix(&elements[..i])?;
                bytes.push(op.to_byte()?);
            }
            ScriptElement::Op(op) => bytes.push(op.to_byte()?),
            ScriptElement::Push(data) => push_data(&mut bytes, data)?,
        }
    }
    Ok(Script(bytes))
}

/// Validate the `OP_m <keys> OP_n` elements in front of a CHECKMULTISIG and
/// return `(m, keys)`
fn check_multisig_prefix(prefix: &[ScriptElement]) -> Result<(usize, Vec<ByteString>)> {
    let invalid = |reason: String| MultisigError::InvalidScript(reason);

    let n = match prefix.last() {
        Some(ScriptElement::Op(op)) => op.small_int(),
        _ => None,
    }
    .ok_or_else(|| invalid("OP_CHECKMULTISIG must follow a key count OP_n".to_string()))?
        as usize;
    if !(1..=MAX_PUBKEYS_PER_MULTISIG).contains(&n) {
        return Err(invalid(format!("key count {} outside 1..=16", n)));
    }
    if prefix.len() < n + 2 {
        return Err(invalid(format!(
            "OP_{} announces {} keys but the script is too short",
            n, n
        )));
    }

    let keys_start = prefix.len() - 1 - n;
    let keys = prefix[keys_start..prefix.len() - 1]
        .iter()
        .map(|element| {
            element
                .as_push()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| invalid(format!("expected {} public key pushes", n)))
        })
        .collect::<Result<Vec<_>>>()?;

    let m = match &prefix[keys_start - 1] {
        ScriptElement::Op(op) => op.small_int(),
        _ => None,
    }
    .ok_or_else(|| invalid("missing threshold OP_m before the keys".to_string()))?
        as usize;
    if m == 0 || m > n {
        return Err(invalid(format!("threshold {} invalid for {} keys", m, n)));
    }
    Ok((m, keys))
}

/// `OP_m <pk1> ... <pkn> OP_n OP_CHECKMULTISIG`
pub fn multisig_redeem_script(m: usize, pubkeys: &[PublicKey]) -> Result<Script> {
    if m > 16 || pubkeys.len() > 16 {
        return Err(MultisigError::InvalidScript(format!(
            "{}-of-{} exceeds OP_16",
            m,
            pubkeys.len()
        )));
    }
    let mut elements = Vec::with_capacity(pubkeys.len() + 3);
    elements.push(ScriptElement::Op(Opcode::Num(m as u8)));
    elements.extend(pubkeys.iter().map(ScriptElement::push));
    elements.push(ScriptElement::Op(Opcode::Num(pubkeys.len() as u8)));
    elements.push(ScriptElement::Op(Opcode::CheckMultiSig));
    let script = build(&elements)?;
    if script.len() > MAX_REDEEM_SCRIPT_SIZE {
        return Err(MultisigError::InvalidScript(format!(
            "redeem script of {} bytes exceeds {}",
            script.len(),
            MAX_REDEEM_SCRIPT_SIZE
        )));
    }
    Ok(script)
}

/// Threshold and public keys of a bare `m`-of-`n` CHECKMULTISIG script
pub fn multisig_params(script: &Script) -> Result<(usize, Vec<ByteString>)> {
    let elements = script.elements()?;
    match elements.split_last() {
        Some((ScriptElement::Op(Opcode::CheckMultiSig), prefix)) => {
            let (m, keys) = check_multisig_prefix(prefix)?;
            if prefix.len() != keys.len() + 2 {
                return Err(MultisigError::InvalidScript(
                    "unexpected elements before the multisig threshold".to_string(),
                ));
            }
            Ok((m, keys))
        }
        _ => Err(MultisigError::InvalidScript(
            "not a multisig redeem script".to_string(),
        )),
    }
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(hash: &Hash160) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    bytes.extend_from_slice(hash);
    bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script(bytes)
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_script(hash: &Hash160) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.extend_from_slice(&[OP_HASH160, 0x14]);
    bytes.extend_from_slice(hash);
    bytes.push(OP_EQUAL);
    Script(bytes)
}

//! Wire codec for embedded name-operation payloads.
//!
//! A payload is the data carried by a transaction's null-data output:
//!
//! ```text
//! 0        2   3
//! |--------|---|----------------------------|
//!  magic    op  opcode-specific fixed fields
//! ```
//!
//! The two-byte magic is `"id"`. Multi-byte integers are big-endian.
//! Variable-length names come last with an explicit length byte and must
//! consume the remaining bytes exactly.
//!
//! The codec is pure and total: [`parse_payload`] returns either a typed
//! [`NameOperation`] or an [`OpParseError`]; it never panics on malformed
//! bytes. [`encode_payload`] emits the canonical byte form, which is also
//! the form hashed into the consensus hash, so the layouts here must stay
//! identical across all implementations.

use std::fmt;

use crate::types::ops::{
    MAX_NAME_LEN, MAX_NAMESPACE_LEN, NameOperation, NamePreorder, NameRegister, NameRevoke,
    NameTransfer, NameUpdate, NamespacePreorder, NamespaceReady, NamespaceReveal, is_valid_name,
    is_valid_namespace_id,
};
use crate::types::{CONSENSUS_HASH_LEN, ConsensusHash, HASH160_LEN, Hash160, SALT_LEN, Salt};

/// Two-byte payload magic.
pub const MAGIC: [u8; 2] = *b"id";

/// Wire opcodes, one per operation kind.
pub mod opcodes {
    pub const PREORDER: u8 = b'?';
    pub const REGISTER: u8 = b':';
    pub const UPDATE: u8 = b'+';
    pub const TRANSFER: u8 = b'>';
    pub const REVOKE: u8 = b'~';
    pub const NAMESPACE_PREORDER: u8 = b'*';
    pub const NAMESPACE_REVEAL: u8 = b'&';
    pub const NAMESPACE_READY: u8 = b'!';
}

/// Transfer flag bit: keep the data hash across the ownership change.
const TRANSFER_KEEP_DATA: u8 = 0x01;

/// Reject reason for a payload that does not parse as a name operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OpParseError {
    /// Payload is too short to contain magic and opcode.
    TooShort,
    /// Payload does not start with the `"id"` magic.
    BadMagic,
    /// Opcode byte is not a recognized operation.
    UnknownOpcode(u8),
    /// A fixed-layout field is missing or truncated.
    Truncated(&'static str),
    /// The declared name length does not match the remaining bytes.
    BadNameLength,
    /// The name or namespace id is not well formed.
    InvalidName,
    /// Name bytes are not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for OpParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpParseError::TooShort => write!(f, "payload too short for magic and opcode"),
            OpParseError::BadMagic => write!(f, "payload magic is not \"id\""),
            OpParseError::UnknownOpcode(op) => write!(f, "unknown opcode 0x{op:02x}"),
            OpParseError::Truncated(field) => write!(f, "payload truncated at {field}"),
            OpParseError::BadNameLength => {
                write!(f, "name length byte does not match remaining payload")
            }
            OpParseError::InvalidName => write!(f, "name or namespace id is not well formed"),
            OpParseError::InvalidUtf8 => write!(f, "name bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for OpParseError {}

/// Returns the wire opcode for an operation.
pub fn opcode_of(op: &NameOperation) -> u8 {
    match op {
        NameOperation::Preorder(_) => opcodes::PREORDER,
        NameOperation::Register(_) => opcodes::REGISTER,
        NameOperation::Update(_) => opcodes::UPDATE,
        NameOperation::Transfer(_) => opcodes::TRANSFER,
        NameOperation::Revoke(_) => opcodes::REVOKE,
        NameOperation::NamespacePreorder(_) => opcodes::NAMESPACE_PREORDER,
        NameOperation::NamespaceReveal(_) => opcodes::NAMESPACE_REVEAL,
        NameOperation::NamespaceReady(_) => opcodes::NAMESPACE_READY,
    }
}

/// Encodes an operation into its canonical wire payload.
///
/// This is the exact byte form embedded on-chain and the form fed into the
/// consensus hash for accepted operations.
pub fn encode_payload(op: &NameOperation) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + 40);
    out.extend_from_slice(&MAGIC);
    out.push(opcode_of(op));

    match op {
        NameOperation::Preorder(p) => {
            out.extend_from_slice(p.fingerprint.as_bytes());
            out.extend_from_slice(p.consensus_hash.as_bytes());
        }
        NameOperation::Register(r) => {
            out.extend_from_slice(r.salt.as_bytes());
            push_name(&mut out, &r.name);
        }
        NameOperation::Update(u) => {
            out.extend_from_slice(u.data_hash.as_bytes());
            push_name(&mut out, &u.name);
        }
        NameOperation::Transfer(t) => {
            out.push(if t.keep_data { TRANSFER_KEEP_DATA } else { 0 });
            push_name(&mut out, &t.name);
        }
        NameOperation::Revoke(r) => {
            push_name(&mut out, &r.name);
        }
        NameOperation::NamespacePreorder(p) => {
            out.extend_from_slice(p.fingerprint.as_bytes());
            out.extend_from_slice(p.consensus_hash.as_bytes());
        }
        NameOperation::NamespaceReveal(r) => {
            out.extend_from_slice(&r.lifetime.to_be_bytes());
            out.extend_from_slice(&r.base_cost.to_be_bytes());
            out.extend_from_slice(&r.cost_decay_ppm.to_be_bytes());
            out.extend_from_slice(r.salt.as_bytes());
            push_name(&mut out, &r.namespace_id);
        }
        NameOperation::NamespaceReady(r) => {
            push_name(&mut out, &r.namespace_id);
        }
    }

    out
}

fn push_name(out: &mut Vec<u8>, name: &str) {
    debug_assert!(name.len() <= MAX_NAME_LEN);
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
}

/// Parses an embedded payload into a typed operation.
///
/// Strict on every axis: wrong magic, unknown opcode, truncated fields,
/// trailing bytes, and malformed names all produce a reject reason.
pub fn parse_payload(payload: &[u8]) -> Result<NameOperation, OpParseError> {
    if payload.len() < 3 {
        return Err(OpParseError::TooShort);
    }
    if payload[0..2] != MAGIC {
        return Err(OpParseError::BadMagic);
    }
    let opcode = payload[2];
    let fields = &payload[3..];

    match opcode {
        opcodes::PREORDER => {
            let (fingerprint, consensus_hash) = take_commitment(fields)?;
            Ok(NameOperation::Preorder(NamePreorder {
                fingerprint,
                consensus_hash,
            }))
        }
        opcodes::REGISTER => {
            let salt = take_salt(fields, "salt")?;
            let name = take_name(&fields[SALT_LEN..], NameKind::Full)?;
            Ok(NameOperation::Register(NameRegister { name, salt }))
        }
        opcodes::UPDATE => {
            if fields.len() < HASH160_LEN {
                return Err(OpParseError::Truncated("data hash"));
            }
            let mut hash = [0u8; HASH160_LEN];
            hash.copy_from_slice(&fields[..HASH160_LEN]);
            let name = take_name(&fields[HASH160_LEN..], NameKind::Full)?;
            Ok(NameOperation::Update(NameUpdate {
                name,
                data_hash: Hash160(hash),
            }))
        }
        opcodes::TRANSFER => {
            if fields.is_empty() {
                return Err(OpParseError::Truncated("transfer flags"));
            }
            let keep_data = fields[0] & TRANSFER_KEEP_DATA != 0;
            let name = take_name(&fields[1..], NameKind::Full)?;
            Ok(NameOperation::Transfer(NameTransfer { name, keep_data }))
        }
        opcodes::REVOKE => {
            let name = take_name(fields, NameKind::Full)?;
            Ok(NameOperation::Revoke(NameRevoke { name }))
        }
        opcodes::NAMESPACE_PREORDER => {
            let (fingerprint, consensus_hash) = take_commitment(fields)?;
            Ok(NameOperation::NamespacePreorder(NamespacePreorder {
                fingerprint,
                consensus_hash,
            }))
        }
        opcodes::NAMESPACE_REVEAL => {
            if fields.len() < 12 {
                return Err(OpParseError::Truncated("namespace pricing"));
            }
            let lifetime = read_u32(&fields[0..4]);
            let base_cost = read_u32(&fields[4..8]);
            let cost_decay_ppm = read_u32(&fields[8..12]);
            let salt = take_salt(&fields[12..], "namespace salt")?;
            let namespace_id = take_name(&fields[12 + SALT_LEN..], NameKind::Namespace)?;
            Ok(NameOperation::NamespaceReveal(NamespaceReveal {
                namespace_id,
                salt,
                lifetime,
                base_cost,
                cost_decay_ppm,
            }))
        }
        opcodes::NAMESPACE_READY => {
            let namespace_id = take_name(fields, NameKind::Namespace)?;
            Ok(NameOperation::NamespaceReady(NamespaceReady {
                namespace_id,
            }))
        }
        other => Err(OpParseError::UnknownOpcode(other)),
    }
}

/// Reads a big-endian u32 from a slice already checked to be 4 bytes.
fn read_u32(bytes: &[u8]) -> u32 {
    let arr: [u8; 4] = bytes
        .try_into()
        .expect("caller must pass exactly four bytes");
    u32::from_be_bytes(arr)
}

fn take_commitment(fields: &[u8]) -> Result<(Hash160, ConsensusHash), OpParseError> {
    if fields.len() != HASH160_LEN + CONSENSUS_HASH_LEN {
        return Err(OpParseError::Truncated("preorder commitment"));
    }
    let mut fp = [0u8; HASH160_LEN];
    fp.copy_from_slice(&fields[..HASH160_LEN]);
    let mut ch = [0u8; CONSENSUS_HASH_LEN];
    ch.copy_from_slice(&fields[HASH160_LEN..]);
    Ok((Hash160(fp), ConsensusHash(ch)))
}

fn take_salt(fields: &[u8], what: &'static str) -> Result<Salt, OpParseError> {
    if fields.len() < SALT_LEN {
        return Err(OpParseError::Truncated(what));
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&fields[..SALT_LEN]);
    Ok(Salt(salt))
}

enum NameKind {
    Full,
    Namespace,
}

/// Decodes a length-prefixed name occupying the remainder of the payload.
fn take_name(fields: &[u8], kind: NameKind) -> Result<String, OpParseError> {
    if fields.is_empty() {
        return Err(OpParseError::Truncated("name length"));
    }
    let declared = fields[0] as usize;
    let rest = &fields[1..];
    if declared != rest.len() {
        return Err(OpParseError::BadNameLength);
    }
    let max = match kind {
        NameKind::Full => MAX_NAME_LEN,
        NameKind::Namespace => MAX_NAMESPACE_LEN,
    };
    if declared == 0 || declared > max {
        return Err(OpParseError::InvalidName);
    }
    let name = std::str::from_utf8(rest).map_err(|_| OpParseError::InvalidUtf8)?;
    let well_formed = match kind {
        NameKind::Full => is_valid_name(name),
        NameKind::Namespace => is_valid_namespace_id(name),
    };
    if !well_formed {
        return Err(OpParseError::InvalidName);
    }
    Ok(name.to_string())
}

//! Output script classification and address extraction.
//!
//! Pure and stateless: given raw script bytes and the chain parameters,
//! identify the standard class, derive the address set, and detect the LBRY
//! claim and purchase forms. Claim scripts wrap a standard payment script
//! behind a prefix of claim opcodes, so a claim output classifies as its
//! inner payment script. Any malformed claim or purchase payload demotes the
//! output to non-standard rather than failing the block.

pub mod claim;
pub mod purchase;

use std::fmt;

use bitcoin::base58;
use bitcoin::hashes::{hash160, Hash};

use crate::params::ChainParams;
use crate::script::claim::ClaimScript;
use crate::script::purchase::Purchase;

// ==============================================================================
// Opcodes
// ==============================================================================

pub(crate) const OP_0: u8 = 0x00;
pub(crate) const OP_PUSHDATA1: u8 = 0x4c;
pub(crate) const OP_PUSHDATA2: u8 = 0x4d;
pub(crate) const OP_PUSHDATA4: u8 = 0x4e;
pub(crate) const OP_1: u8 = 0x51;
pub(crate) const OP_16: u8 = 0x60;
pub(crate) const OP_RETURN: u8 = 0x6a;
pub(crate) const OP_2DROP: u8 = 0x6d;
pub(crate) const OP_DROP: u8 = 0x75;
pub(crate) const OP_DUP: u8 = 0x76;
pub(crate) const OP_EQUAL: u8 = 0x87;
pub(crate) const OP_EQUALVERIFY: u8 = 0x88;
pub(crate) const OP_HASH160: u8 = 0xa9;
pub(crate) const OP_CHECKSIG: u8 = 0xac;
pub(crate) const OP_CHECKMULTISIG: u8 = 0xae;

// ==============================================================================
// Script Class
// ==============================================================================

/// Standard script classes, after any claim prefix has been stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptClass {
    NonStandard,
    PubKey,
    PubKeyHash,
    ScriptHash,
    Multisig,
    NullData,
    WitnessV0KeyHash,
    WitnessV0ScriptHash,
}

impl fmt::Display for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NonStandard => "nonstandard",
            Self::PubKey => "pubkey",
            Self::PubKeyHash => "pubkeyhash",
            Self::ScriptHash => "scripthash",
            Self::Multisig => "multisig",
            Self::NullData => "nulldata",
            Self::WitnessV0KeyHash => "witness_v0_keyhash",
            Self::WitnessV0ScriptHash => "witness_v0_scripthash",
        };
        f.write_str(name)
    }
}

/// Everything the classifier can say about one output script.
#[derive(Debug, Clone)]
pub struct ScriptInfo {
    pub class: ScriptClass,
    /// Encoded addresses. Usually zero or one; bare multisig yields one per
    /// pubkey.
    pub addresses: Vec<String>,
    pub claim: Option<ClaimScript>,
    pub purchase: Option<Purchase>,
}

impl ScriptInfo {
    fn non_standard() -> Self {
        Self {
            class: ScriptClass::NonStandard,
            addresses: Vec::new(),
            claim: None,
            purchase: None,
        }
    }
}

// ==============================================================================
// Evaluation
// ==============================================================================

/// Classify a script and extract its addresses and LBRY-specific payloads.
pub fn evaluate(script: &[u8], params: &ChainParams) -> ScriptInfo {
    let claim = claim::extract(script);
    let payment = claim
        .as_ref()
        .map(|c| c.inner_pk_script.as_bytes())
        .unwrap_or(script);

    let (class, addresses) = classify_standard(payment, params);
    if class == ScriptClass::NonStandard {
        // A claim wrapping a non-standard payment script is reported as
        // plain non-standard, matching the node's address extraction.
        return ScriptInfo::non_standard();
    }

    let purchase = if claim.is_none() {
        purchase::extract(script)
    } else {
        None
    };

    ScriptInfo {
        class,
        addresses,
        claim,
        purchase,
    }
}

/// Match the standard script templates and derive their addresses.
fn classify_standard(s: &[u8], params: &ChainParams) -> (ScriptClass, Vec<String>) {
    // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
    if s.len() == 25
        && s[0] == OP_DUP
        && s[1] == OP_HASH160
        && s[2] == 0x14
        && s[23] == OP_EQUALVERIFY
        && s[24] == OP_CHECKSIG
    {
        let addr = base58check(params.pubkey_hash_prefix, &s[3..23]);
        return (ScriptClass::PubKeyHash, vec![addr]);
    }

    // OP_HASH160 <20> OP_EQUAL
    if s.len() == 23 && s[0] == OP_HASH160 && s[1] == 0x14 && s[22] == OP_EQUAL {
        let addr = base58check(params.script_hash_prefix, &s[2..22]);
        return (ScriptClass::ScriptHash, vec![addr]);
    }

    // <33|65-byte pubkey> OP_CHECKSIG
    if let Some(pubkey) = pay_to_pubkey(s) {
        let addr = pubkey_address(pubkey, params);
        return (ScriptClass::PubKey, vec![addr]);
    }

    // OP_0 <20> / OP_0 <32>
    if s.len() == 22 && s[0] == OP_0 && s[1] == 0x14 {
        let addrs = witness_address(&s[2..], params).into_iter().collect();
        return (ScriptClass::WitnessV0KeyHash, addrs);
    }
    if s.len() == 34 && s[0] == OP_0 && s[1] == 0x20 {
        let addrs = witness_address(&s[2..], params).into_iter().collect();
        return (ScriptClass::WitnessV0ScriptHash, addrs);
    }

    // OP_RETURN followed by well-formed pushes carries data, not value.
    if is_null_data(s) {
        return (ScriptClass::NullData, Vec::new());
    }

    if let Some(pubkeys) = bare_multisig(s) {
        let addrs = pubkeys
            .iter()
            .map(|pk| pubkey_address(pk, params))
            .collect();
        return (ScriptClass::Multisig, addrs);
    }

    (ScriptClass::NonStandard, Vec::new())
}

fn pay_to_pubkey(s: &[u8]) -> Option<&[u8]> {
    match s.len() {
        35 if s[0] == 0x21 && (s[1] == 0x02 || s[1] == 0x03) && s[34] == OP_CHECKSIG => {
            Some(&s[1..34])
        }
        67 if s[0] == 0x41 && s[1] == 0x04 && s[66] == OP_CHECKSIG => Some(&s[1..66]),
        _ => None,
    }
}

fn is_null_data(s: &[u8]) -> bool {
    if s.first() != Some(&OP_RETURN) {
        return false;
    }
    // The remainder must parse as data pushes only.
    let mut pos = 1;
    while pos < s.len() {
        match read_push(s, &mut pos) {
            Some(_) => {}
            None => return false,
        }
    }
    true
}

/// `OP_M <pubkey>... OP_N OP_CHECKMULTISIG` with 1 <= M <= N.
fn bare_multisig(s: &[u8]) -> Option<Vec<&[u8]>> {
    if s.len() < 3 || s[s.len() - 1] != OP_CHECKMULTISIG {
        return None;
    }
    let required = small_int(s[0])?;
    let total = small_int(s[s.len() - 2])?;
    if required == 0 || required > total {
        return None;
    }

    let mut pubkeys = Vec::with_capacity(total as usize);
    let mut pos = 1;
    while pos < s.len() - 2 {
        let push = read_push(s, &mut pos)?;
        let valid_key = matches!(
            (push.len(), push.first().copied()),
            (33, Some(0x02) | Some(0x03)) | (65, Some(0x04))
        );
        if !valid_key {
            return None;
        }
        pubkeys.push(push);
    }
    if pubkeys.len() != total as usize {
        return None;
    }
    Some(pubkeys)
}

fn small_int(op: u8) -> Option<u8> {
    (OP_1..=OP_16).contains(&op).then(|| op - OP_1 + 1)
}

/// Read one data push at `pos`, advancing past it. Handles the direct push
/// opcodes and OP_PUSHDATA1/2/4. Returns the pushed bytes.
pub(crate) fn read_push<'a>(s: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let op = *s.get(*pos)?;
    *pos += 1;
    let len = match op {
        1..=0x4b => op as usize,
        OP_PUSHDATA1 => {
            let len = *s.get(*pos)? as usize;
            *pos += 1;
            len
        }
        OP_PUSHDATA2 => {
            let bytes = s.get(*pos..*pos + 2)?;
            *pos += 2;
            u16::from_le_bytes([bytes[0], bytes[1]]) as usize
        }
        OP_PUSHDATA4 => {
            let bytes = s.get(*pos..*pos + 4)?;
            *pos += 4;
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
        }
        _ => return None,
    };
    let data = s.get(*pos..*pos + len)?;
    *pos += len;
    Some(data)
}

// ==============================================================================
// Address Encoding
// ==============================================================================

fn base58check(prefix: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(prefix);
    data.extend_from_slice(payload);
    base58::encode_check(&data)
}

/// P2PK outputs are addressed by the pubkey's hash160, same as p2pkh.
fn pubkey_address(pubkey: &[u8], params: &ChainParams) -> String {
    let digest = hash160::Hash::hash(pubkey);
    base58check(params.pubkey_hash_prefix, digest.as_byte_array())
}

fn witness_address(program: &[u8], params: &ChainParams) -> Option<String> {
    let hrp = bech32::Hrp::parse(params.bech32_hrp).ok()?;
    bech32::segwit::encode(hrp, bech32::Fe32::Q, program).ok()
}

//! LBRY claim script extraction.
//!
//! Claim operations prefix an otherwise standard payment script:
//!
//! ```text
//! OP_CLAIMNAME    <name> <value>            OP_2DROP OP_DROP  <payment script>
//! OP_SUPPORTCLAIM <name> <claimid>          OP_2DROP OP_DROP  <payment script>
//! OP_SUPPORTCLAIM <name> <claimid> <value>  OP_2DROP OP_2DROP <payment script>
//! OP_UPDATECLAIM  <name> <claimid> <value>  OP_2DROP OP_2DROP <payment script>
//! ```
//!
//! Interpretation of the claim value (a protobuf of its own) is out of scope
//! here; extraction only identifies the operation and its raw pushes.

use std::fmt;

use bitcoin::hashes::{hash160, Hash};

use crate::script::{read_push, OP_2DROP, OP_DROP};
use crate::types::{hex_string, Outpoint, Script};

pub const OP_CLAIM_NAME: u8 = 0xb5;
pub const OP_SUPPORT_CLAIM: u8 = 0xb6;
pub const OP_UPDATE_CLAIM: u8 = 0xb7;

/// Claim names are capped by consensus; anything longer is not a claim
/// script.
const MAX_CLAIM_NAME_LEN: usize = 255;

/// A claim id is the hash160 of the claim's first outpoint.
const CLAIM_ID_LEN: usize = 20;

// ==============================================================================
// Claim Operations
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimOp {
    ClaimName,
    SupportClaim,
    UpdateClaim,
}

impl ClaimOp {
    pub fn opcode(self) -> u8 {
        match self {
            Self::ClaimName => OP_CLAIM_NAME,
            Self::SupportClaim => OP_SUPPORT_CLAIM,
            Self::UpdateClaim => OP_UPDATE_CLAIM,
        }
    }

    fn from_opcode(op: u8) -> Option<Self> {
        match op {
            OP_CLAIM_NAME => Some(Self::ClaimName),
            OP_SUPPORT_CLAIM => Some(Self::SupportClaim),
            OP_UPDATE_CLAIM => Some(Self::UpdateClaim),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClaimName => "CLAIMNAME",
            Self::SupportClaim => "SUPPORTCLAIM",
            Self::UpdateClaim => "UPDATECLAIM",
        };
        f.write_str(name)
    }
}

/// A decoded claim prefix plus the payment script behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimScript {
    pub opcode: ClaimOp,
    pub name: Vec<u8>,
    /// Present for supports and updates; creations have no id yet.
    pub claim_id: Option<[u8; CLAIM_ID_LEN]>,
    /// Raw claim value bytes. Empty for supports without a value.
    pub value: Vec<u8>,
    /// The standard payment script following the claim prefix.
    pub inner_pk_script: Script,
}

// ==============================================================================
// Extraction
// ==============================================================================

/// Extract a claim script, or `None` if the bytes do not form one.
pub fn extract(script: &[u8]) -> Option<ClaimScript> {
    let opcode = ClaimOp::from_opcode(*script.first()?)?;
    let mut pos = 1;

    let name = read_push(script, &mut pos)?;
    if name.is_empty() || name.len() > MAX_CLAIM_NAME_LEN {
        return None;
    }
    let name = name.to_vec();

    let (claim_id, value) = match opcode {
        ClaimOp::ClaimName => {
            let value = read_push(script, &mut pos)?.to_vec();
            expect_ops(script, &mut pos, &[OP_2DROP, OP_DROP])?;
            (None, value)
        }
        ClaimOp::UpdateClaim => {
            let claim_id = fixed_push::<CLAIM_ID_LEN>(script, &mut pos)?;
            let value = read_push(script, &mut pos)?.to_vec();
            expect_ops(script, &mut pos, &[OP_2DROP, OP_2DROP])?;
            (Some(claim_id), value)
        }
        ClaimOp::SupportClaim => {
            let claim_id = fixed_push::<CLAIM_ID_LEN>(script, &mut pos)?;
            // A support may carry a value. Push opcodes and OP_2DROP are
            // disjoint byte ranges, so probing for a push is unambiguous.
            let mut value_pos = pos;
            match read_push(script, &mut value_pos) {
                Some(value) => {
                    let value = value.to_vec();
                    pos = value_pos;
                    expect_ops(script, &mut pos, &[OP_2DROP, OP_2DROP])?;
                    (Some(claim_id), value)
                }
                None => {
                    expect_ops(script, &mut pos, &[OP_2DROP, OP_DROP])?;
                    (Some(claim_id), Vec::new())
                }
            }
        }
    };

    Some(ClaimScript {
        opcode,
        name,
        claim_id,
        value,
        inner_pk_script: Script::from(script[pos..].to_vec()),
    })
}

fn fixed_push<const N: usize>(script: &[u8], pos: &mut usize) -> Option<[u8; N]> {
    let data = read_push(script, pos)?;
    data.try_into().ok()
}

/// Consume the exact opcode sequence, or leave `pos` untouched.
fn expect_ops(script: &[u8], pos: &mut usize, ops: &[u8]) -> Option<()> {
    if script.get(*pos..*pos + ops.len())? == ops {
        *pos += ops.len();
        Some(())
    } else {
        None
    }
}

// ==============================================================================
// Claim IDs
// ==============================================================================

/// Derive the claim id for a claim created at `outpoint`: hash160 over the
/// display-order txid plus the big-endian output index, rendered reversed.
pub fn claim_id_from_outpoint(outpoint: &Outpoint) -> String {
    let mut data = Vec::with_capacity(36);
    let mut txid = *outpoint.txid.as_byte_array();
    txid.reverse();
    data.extend_from_slice(&txid);
    data.extend_from_slice(&outpoint.nout.to_be_bytes());

    let mut digest = *hash160::Hash::hash(&data).as_byte_array();
    digest.reverse();
    hex_string(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TxHash;

    fn p2pkh_tail() -> Vec<u8> {
        let mut s = vec![0x76, 0xa9, 0x14];
        s.extend_from_slice(&[0xaa; 20]);
        s.extend_from_slice(&[0x88, 0xac]);
        s
    }

    #[test]
    fn extracts_claim_name() {
        let mut s = vec![OP_CLAIM_NAME, 0x05];
        s.extend_from_slice(b"hello");
        s.extend_from_slice(&[0x03, 0x01, 0x02, 0x03]);
        s.extend_from_slice(&[OP_2DROP, OP_DROP]);
        s.extend_from_slice(&p2pkh_tail());

        let claim = extract(&s).expect("valid claim script");
        assert_eq!(claim.opcode, ClaimOp::ClaimName);
        assert_eq!(claim.name, b"hello");
        assert_eq!(claim.claim_id, None);
        assert_eq!(claim.value, vec![0x01, 0x02, 0x03]);
        assert_eq!(claim.inner_pk_script.as_bytes(), p2pkh_tail());
    }

    #[test]
    fn extracts_update_claim() {
        let mut s = vec![OP_UPDATE_CLAIM, 0x01, b'x'];
        s.push(0x14);
        s.extend_from_slice(&[0x42; 20]);
        s.extend_from_slice(&[0x02, 0xca, 0xfe]);
        s.extend_from_slice(&[OP_2DROP, OP_2DROP]);
        s.extend_from_slice(&p2pkh_tail());

        let claim = extract(&s).expect("valid update script");
        assert_eq!(claim.opcode, ClaimOp::UpdateClaim);
        assert_eq!(claim.claim_id, Some([0x42; 20]));
        assert_eq!(claim.value, vec![0xca, 0xfe]);
    }

    #[test]
    fn extracts_support_with_and_without_value() {
        let mut bare = vec![OP_SUPPORT_CLAIM, 0x01, b'x'];
        bare.push(0x14);
        bare.extend_from_slice(&[0x42; 20]);
        bare.extend_from_slice(&[OP_2DROP, OP_DROP]);
        bare.extend_from_slice(&p2pkh_tail());
        let claim = extract(&bare).expect("valid support script");
        assert_eq!(claim.opcode, ClaimOp::SupportClaim);
        assert!(claim.value.is_empty());

        let mut with_value = vec![OP_SUPPORT_CLAIM, 0x01, b'x'];
        with_value.push(0x14);
        with_value.extend_from_slice(&[0x42; 20]);
        with_value.extend_from_slice(&[0x01, 0x99]);
        with_value.extend_from_slice(&[OP_2DROP, OP_2DROP]);
        with_value.extend_from_slice(&p2pkh_tail());
        let claim = extract(&with_value).expect("valid support-with-value script");
        assert_eq!(claim.value, vec![0x99]);
    }

    #[test]
    fn rejects_wrong_claim_id_length() {
        let mut s = vec![OP_UPDATE_CLAIM, 0x01, b'x'];
        s.push(0x13); // 19-byte id
        s.extend_from_slice(&[0x42; 19]);
        s.extend_from_slice(&[0x01, 0x00, OP_2DROP, OP_2DROP]);
        s.extend_from_slice(&p2pkh_tail());
        assert!(extract(&s).is_none());
    }

    #[test]
    fn rejects_empty_name_and_missing_drops() {
        let s = vec![OP_CLAIM_NAME, 0x00];
        assert!(extract(&s).is_none());

        let mut s = vec![OP_CLAIM_NAME, 0x01, b'x', 0x01, 0x00];
        s.extend_from_slice(&p2pkh_tail()); // no OP_2DROP OP_DROP
        assert!(extract(&s).is_none());
    }

    #[test]
    fn non_claim_scripts_pass_through() {
        assert!(extract(&p2pkh_tail()).is_none());
        assert!(extract(&[]).is_none());
    }

    #[test]
    fn claim_id_matches_hash160_of_reversed_outpoint() {
        let outpoint = Outpoint {
            txid: TxHash::all_zeros(),
            nout: 0,
        };
        let id = claim_id_from_outpoint(&outpoint);
        assert_eq!(id.len(), 40);

        // hash160 of 32 zero bytes + 4 zero bytes, reversed.
        let expected = {
            let digest = hash160::Hash::hash(&[0u8; 36]);
            let mut bytes = *digest.as_byte_array();
            bytes.reverse();
            hex_string(&bytes)
        };
        assert_eq!(id, expected);
    }
}

//! OP_RETURN purchase markers.
//!
//! A purchase output embeds a protobuf `Purchase` message in a null-data
//! script: `OP_RETURN <len> 'P' <protobuf>`, where `<len>` covers everything
//! after it. The parse is strict; any mismatch means the output is ordinary
//! null-data, not a purchase.

use prost::Message;

use crate::script::OP_RETURN;
use crate::types::hex_string;

/// ASCII 'P', the byte that marks the payload as a purchase.
const PURCHASE_TAG: u8 = 0x50;

/// The purchase payload: which claim was bought.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Purchase {
    /// RIPEMD-160 claim hash in wire order (reversed from the display form).
    #[prost(bytes = "vec", tag = "1")]
    pub claim_hash: Vec<u8>,
}

impl Purchase {
    /// The claim id in its display form (byte-reversed hex).
    pub fn claim_id(&self) -> String {
        let mut bytes = self.claim_hash.clone();
        bytes.reverse();
        hex_string(&bytes)
    }
}

/// True when the script is a well-formed purchase marker.
pub fn is_purchase_script(script: &[u8]) -> bool {
    extract(script).is_some()
}

/// Parse a purchase script, or `None` when the bytes are anything else.
pub(crate) fn extract(script: &[u8]) -> Option<Purchase> {
    if script.len() <= 2 || script[0] != OP_RETURN {
        return None;
    }
    let data_len = script[1] as usize;
    if script.len() != data_len + 2 {
        return None;
    }
    if script[2] != PURCHASE_TAG {
        return None;
    }
    Purchase::decode(&script[3..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("valid hex"))
            .collect()
    }

    #[test]
    fn parses_known_purchase_script() {
        let script = unhex("6a17500a14b5fb292f0ccb678a0c393b5ab47c522d1a9f4bfc");
        assert!(is_purchase_script(&script));

        let purchase = extract(&script).expect("purchase parses");
        assert_eq!(
            purchase.claim_id(),
            "fc4b9f1a2d527cb45a3b390c8a67cb0c2f29fbb5"
        );
    }

    #[test]
    fn rejects_wrong_length_byte() {
        // Length byte says 0x18 but only 0x17 bytes follow.
        let script = unhex("6a18500a14b5fb292f0ccb678a0c393b5ab47c522d1a9f4bfc");
        assert!(!is_purchase_script(&script));
    }

    #[test]
    fn rejects_missing_purchase_tag() {
        let script = unhex("6a17510a14b5fb292f0ccb678a0c393b5ab47c522d1a9f4bfc");
        assert!(!is_purchase_script(&script));
    }

    #[test]
    fn rejects_malformed_protobuf() {
        // Field header promises 0x14 bytes but the payload is truncated —
        // the length byte is consistent, the protobuf is not.
        let script = unhex("6a0a500a14b5fb292f0ccb67");
        assert!(!is_purchase_script(&script));
    }

    #[test]
    fn rejects_plain_null_data() {
        let script = unhex("6a03aabbcc");
        assert!(!is_purchase_script(&script));
    }
}

//! Block deserialization.
//!
//! Decodes one framed block after the file layer has consumed the magic and
//! size prefix. The interesting part is transaction id reconstruction: the
//! txid is the double-SHA-256 of the *non-witness* serialization, so bytes
//! are mirrored into a hash buffer as they are parsed — except the segwit
//! marker/flag pair and the witness section, which never enter the buffer,
//! and the input count of a legacy transaction, which is re-serialized into
//! it after being peeked from the raw stream.

use std::io::Read;

use bitcoin::hashes::{sha256d, Hash};

use crate::bytes::{checked_size, write_compact_size, TeeReader, WireRead};
use crate::error::DecodeError;
use crate::params::ChainParams;
use crate::script::{self, ScriptClass};
use crate::types::{Block, Header, Input, Output, Script, Transaction, WitnessStack};

pub(crate) const HEADER_LEN: usize = 112;

/// Header versions observed on the LBRY chain: 1 pre-BIP9, then the BIP9
/// version-bits base with and without the low bit.
const VALID_VERSIONS: [u32; 3] = [1, 0x2000_0000, 0x2000_0001];

/// Decode one block body (header, tx count, transactions). The caller owns
/// framing and fills in `size` and `height` afterwards.
pub fn read_block<R: Read>(r: &mut R, params: &ChainParams) -> Result<Block, DecodeError> {
    let header = read_header(r)?;
    let tx_count = checked_size(r.read_compact_size()?)?;
    let transactions = read_transactions(r, tx_count, params)?;

    Ok(Block {
        size: 0,
        height: 0,
        header,
        transactions,
    })
}

pub(crate) fn read_header<R: Read>(r: &mut R) -> Result<Header, DecodeError> {
    let bytes: [u8; HEADER_LEN] = r.read_array()?;
    let block_hash = sha256d::Hash::hash(&bytes);

    let version = u32::from_le_bytes(bytes[0..4].try_into().expect("4-byte slice"));
    if !VALID_VERSIONS.contains(&version) {
        return Err(DecodeError::BadVersion(version));
    }

    let mut prev = <[u8; 32]>::try_from(&bytes[4..36]).expect("32-byte slice");
    prev.reverse();

    Ok(Header {
        version,
        prev_hash: sha256d::Hash::from_byte_array(prev),
        merkle_root: bytes[36..68].try_into().expect("32-byte slice"),
        claim_trie_root: bytes[68..100].try_into().expect("32-byte slice"),
        timestamp: u32::from_le_bytes(bytes[100..104].try_into().expect("4-byte slice")),
        bits: u32::from_le_bytes(bytes[104..108].try_into().expect("4-byte slice")),
        nonce: u32::from_le_bytes(bytes[108..112].try_into().expect("4-byte slice")),
        block_hash,
    })
}

/// Corrupt counts pass the compact-size sanity check long before a vector
/// this large could be filled; cap the pre-allocation and let real reads
/// drive growth.
fn bounded_capacity(count: usize) -> usize {
    count.min(16 * 1024)
}

fn read_transactions<R: Read>(
    r: &mut R,
    count: usize,
    params: &ChainParams,
) -> Result<Vec<Transaction>, DecodeError> {
    let mut transactions = Vec::with_capacity(bounded_capacity(count));
    // Reused across transactions; holds the non-witness serialization.
    let mut hash_buf: Vec<u8> = Vec::with_capacity(4096);

    for _ in 0..count {
        hash_buf.clear();

        let version = TeeReader::new(r, &mut hash_buf).read_u32_le()?;

        // The next compact size is either the input count or, if zero, the
        // segwit marker. Read it from the raw stream: we only know where its
        // bytes belong once we know which it was.
        let count_or_marker = r.read_compact_size()?;
        let (is_segwit, input_count) = if count_or_marker == 0 {
            let flag = r.read_u8()?;
            if flag != 0x01 {
                return Err(DecodeError::BadSegwitFlag(flag));
            }
            // Marker and flag stay out of the hash buffer; the real input
            // count goes in.
            let n = TeeReader::new(r, &mut hash_buf).read_compact_size()?;
            (true, checked_size(n)?)
        } else {
            // The count's bytes bypassed the tee; re-serialize them.
            write_compact_size(&mut hash_buf, count_or_marker)?;
            (false, checked_size(count_or_marker)?)
        };

        let (inputs, outputs) = {
            let mut tee = TeeReader::new(r, &mut hash_buf);

            let mut inputs = Vec::with_capacity(bounded_capacity(input_count));
            for _ in 0..input_count {
                inputs.push(read_input(&mut tee)?);
            }

            let output_count = checked_size(tee.read_compact_size()?)?;
            let mut outputs = Vec::with_capacity(bounded_capacity(output_count));
            for _ in 0..output_count {
                outputs.push(read_output(&mut tee, params)?);
            }

            (inputs, outputs)
        };

        let witnesses = if is_segwit {
            read_witnesses(r, inputs.len())?
        } else {
            Vec::new()
        };

        let lock_time = TeeReader::new(r, &mut hash_buf).read_u32_le()?;
        let hash = sha256d::Hash::hash(&hash_buf);

        transactions.push(Transaction {
            version,
            is_segwit,
            hash,
            inputs,
            outputs,
            witnesses,
            lock_time,
        });
    }

    Ok(transactions)
}

fn read_input<R: Read>(r: &mut R) -> Result<Input, DecodeError> {
    let prev_tx_hash = sha256d::Hash::from_byte_array(r.read_array()?);
    let prev_tx_index = r.read_u32_le()?;
    let script_len = checked_size(r.read_compact_size()?)?;
    let script = Script::from(r.read_vec(script_len)?);
    let sequence = r.read_u32_be()?;

    Ok(Input {
        prev_tx_hash,
        prev_tx_index,
        script,
        sequence,
    })
}

fn read_output<R: Read>(r: &mut R, params: &ChainParams) -> Result<Output, DecodeError> {
    let amount = r.read_u64_le()?;
    let script_len = checked_size(r.read_compact_size()?)?;
    let script_bytes = r.read_vec(script_len)?;

    let mut info = script::evaluate(&script_bytes, params);
    let pk_script = Script::from(script_bytes);

    if info.addresses.is_empty() && info.class != ScriptClass::NullData {
        tracing::warn!(class = %info.class, script = %pk_script, "output has no extractable address");
    }

    // A single address becomes the output's address; multisig keeps none
    // (its full set stays in the classifier's hands).
    let address = if info.addresses.len() == 1 {
        info.addresses.pop()
    } else {
        None
    };

    Ok(Output {
        amount,
        pk_script,
        script_class: info.class,
        address,
        claim: info.claim,
        purchase: info.purchase,
    })
}

/// Witness data is consumed but never enters the txid hash buffer.
fn read_witnesses<R: Read>(r: &mut R, input_count: usize) -> Result<Vec<WitnessStack>, DecodeError> {
    let mut witnesses = Vec::with_capacity(bounded_capacity(input_count));
    for _ in 0..input_count {
        let item_count = checked_size(r.read_compact_size()?)?;
        let mut stack = Vec::with_capacity(bounded_capacity(item_count));
        for _ in 0..item_count {
            let len = checked_size(r.read_compact_size()?)?;
            stack.push(r.read_vec(len)?);
        }
        witnesses.push(stack);
    }
    Ok(witnesses)
}

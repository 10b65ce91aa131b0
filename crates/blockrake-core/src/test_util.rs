//! Shared wire-format builders for blockrake-core unit tests.
//!
//! Everything here produces raw bytes in the on-disk block format, so tests
//! exercise the real decoding path instead of hand-assembled structs.

use crate::bytes::write_compact_size;

/// Append a compact size to a byte vector.
fn push_compact_size(buf: &mut Vec<u8>, value: u64) {
    write_compact_size(buf, value).expect("writing to a Vec cannot fail");
}

/// A 112-byte LBRY header with the given fields, in wire order.
pub(crate) fn header_bytes(
    version: u32,
    prev_hash: [u8; 32],
    merkle_root: [u8; 32],
    claim_trie_root: [u8; 32],
    timestamp: u32,
    bits: u32,
    nonce: u32,
) -> [u8; 112] {
    let mut bytes = [0u8; 112];
    bytes[0..4].copy_from_slice(&version.to_le_bytes());
    bytes[4..36].copy_from_slice(&prev_hash);
    bytes[36..68].copy_from_slice(&merkle_root);
    bytes[68..100].copy_from_slice(&claim_trie_root);
    bytes[100..104].copy_from_slice(&timestamp.to_le_bytes());
    bytes[104..108].copy_from_slice(&bits.to_le_bytes());
    bytes[108..112].copy_from_slice(&nonce.to_le_bytes());
    bytes
}

/// One serialized input. `sequence_wire` is written verbatim; the decoder
/// surfaces it byte-reversed.
pub(crate) fn input_bytes(
    prev_tx_hash: [u8; 32],
    prev_tx_index: u32,
    script: &[u8],
    sequence_wire: [u8; 4],
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&prev_tx_hash);
    buf.extend_from_slice(&prev_tx_index.to_le_bytes());
    push_compact_size(&mut buf, script.len() as u64);
    buf.extend_from_slice(script);
    buf.extend_from_slice(&sequence_wire);
    buf
}

/// One serialized output.
pub(crate) fn output_bytes(amount: u64, script: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&amount.to_le_bytes());
    push_compact_size(&mut buf, script.len() as u64);
    buf.extend_from_slice(script);
    buf
}

/// A standard p2pkh script paying to a hash of repeated `seed` bytes.
pub(crate) fn p2pkh_script(seed: u8) -> Vec<u8> {
    let mut s = vec![0x76, 0xa9, 0x14];
    s.extend_from_slice(&[seed; 20]);
    s.extend_from_slice(&[0x88, 0xac]);
    s
}

/// A legacy (non-segwit) transaction in wire order.
pub(crate) fn legacy_tx_bytes(
    version: u32,
    inputs: &[Vec<u8>],
    outputs: &[Vec<u8>],
    lock_time: u32,
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&version.to_le_bytes());
    push_compact_size(&mut buf, inputs.len() as u64);
    for input in inputs {
        buf.extend_from_slice(input);
    }
    push_compact_size(&mut buf, outputs.len() as u64);
    for output in outputs {
        buf.extend_from_slice(output);
    }
    buf.extend_from_slice(&lock_time.to_le_bytes());
    buf
}

/// A segwit transaction: marker/flag after the version, one witness stack
/// per input before the lock time.
pub(crate) fn segwit_tx_bytes(
    version: u32,
    inputs: &[Vec<u8>],
    outputs: &[Vec<u8>],
    witness_stacks: &[Vec<Vec<u8>>],
    lock_time: u32,
) -> Vec<u8> {
    assert_eq!(inputs.len(), witness_stacks.len(), "one stack per input");

    let mut buf = Vec::new();
    buf.extend_from_slice(&version.to_le_bytes());
    buf.push(0x00); // marker
    buf.push(0x01); // flag
    push_compact_size(&mut buf, inputs.len() as u64);
    for input in inputs {
        buf.extend_from_slice(input);
    }
    push_compact_size(&mut buf, outputs.len() as u64);
    for output in outputs {
        buf.extend_from_slice(output);
    }
    for stack in witness_stacks {
        push_compact_size(&mut buf, stack.len() as u64);
        for item in stack {
            push_compact_size(&mut buf, item.len() as u64);
            buf.extend_from_slice(item);
        }
    }
    buf.extend_from_slice(&lock_time.to_le_bytes());
    buf
}

/// A minimal coinbase transaction paying one p2pkh output.
pub(crate) fn coinbase_tx_bytes(seed: u8) -> Vec<u8> {
    legacy_tx_bytes(
        1,
        &[input_bytes([0u8; 32], 0xFFFF_FFFF, &[0x51], [0xff; 4])],
        &[output_bytes(50_0000_0000, &p2pkh_script(seed))],
        0,
    )
}

/// A block body: header, tx count, transactions. No file framing.
pub(crate) fn block_bytes(header: &[u8], transactions: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(header);
    push_compact_size(&mut buf, transactions.len() as u64);
    for tx in transactions {
        buf.extend_from_slice(tx);
    }
    buf
}

/// A framed file record: magic, size, block body.
pub(crate) fn block_record(magic: [u8; 4], block: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&magic);
    buf.extend_from_slice(&(block.len() as u32).to_le_bytes());
    buf.extend_from_slice(block);
    buf
}

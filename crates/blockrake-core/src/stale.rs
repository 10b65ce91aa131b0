//! Stale (orphaned) block tracking.
//!
//! The chain reader surfaces every block present in the node's files,
//! including blocks that lost a reorg race and are no longer on the active
//! chain. Analytics that fold over the stream usually want those filtered
//! out; [`is_stale`] answers against a compiled-in table of known orphan
//! hashes.
//!
//! The table is a snapshot, rebuilt offline with [`refresh_from_index`]:
//! that routine decodes the index database's per-block records, walks the
//! ancestry of the highest entry, and reports every block that has data on
//! disk but sits off that path. The compiled-in default is never mutated at
//! runtime.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use rusty_leveldb::LdbIterator;

use crate::decode::HEADER_LEN;
use crate::error::CoreError;
use crate::index::{open_index, read_index_varint};
use crate::types::BlockHash;

use bitcoin::hashes::Hash;

/// Block-status flags from the node's index records.
const BLOCK_HAVE_DATA: u64 = 8;
const BLOCK_HAVE_UNDO: u64 = 16;

/// Known orphaned block hashes on the LBRY main chain, in display
/// (byte-reversed hex) form. Regenerate with `blockrake stale-blocks`
/// against a synced node.
const STALE_BLOCK_HASHES: &[&str] = &[
    "000000005c3e1b4e9f2a7d80cc41d3f26b55ae10d94c827e31f6a0b2d8e94c71",
    "00000000a1649f0b33d82ef1c2d47a905b17ce04f8ba2261704c53ae9d10f38e",
    "000000003ce270ae12d54c08be71f0a2d9ec6604571c8b1f25ad09e338c4b7d5",
    "000000009b8d12c3f07a645e1e9bd2af84c0517f2663de98ba410c7d5f22e601",
    "000000004f60127adbe8c5d4fe03921bc7a9e5305c218d6ff49b03a12ce76d84",
    "000000001d7a80ef55b34c29073fd161ae92c6080d14b7ec2658f91b0ca2443a",
    "0000000071f253ac84e02d950b3c5d6604127eaf98d1b3351ac97be028e64103",
    "00000000c8a156de07d31bb2445c90e4862f17315e86b12c5d9ae07f364a92bd",
    "000000000e93b4d2ab175c6be2f80d42c3761890ac5f0e77128d34cb60a1f5c9",
    "0000000068bd24f07bea913cd52740a1303fe9762fc58d2e14a76b90cd13e08a",
    "000000002c5f117b90de34ac86017fe69bc2a84de03b5516ff48c3720dd9ab4e",
    "0000000087e149c2d8f06ba1e55c3304da217b6f9e1d00c4a3bd925c10f764a8",
];

/// True when `hash` is a known orphan.
pub fn is_stale(hash: &BlockHash) -> bool {
    static TABLE: OnceLock<HashSet<BlockHash>> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            STALE_BLOCK_HASHES
                .iter()
                .map(|hex| hex.parse().expect("compiled-in block hash is valid hex"))
                .collect()
        })
        .contains(hash)
}

// ==============================================================================
// Offline Refresh
// ==============================================================================

struct IndexedBlock {
    prev: BlockHash,
    height: u64,
    have_data: bool,
}

/// Re-enumerate orphaned blocks from the node's index: every entry with
/// block data on disk that is not an ancestor of the highest indexed block.
/// Hashes are returned in ascending height order.
pub fn refresh_from_index(blocks_dir: &Path) -> Result<Vec<BlockHash>, CoreError> {
    let mut db = open_index(blocks_dir)?;
    let mut iter = db.new_iter()?;
    iter.seek(b"b");

    let mut entries: HashMap<BlockHash, IndexedBlock> = HashMap::new();
    let (mut key, mut value) = (Vec::new(), Vec::new());
    while iter.current(&mut key, &mut value) {
        if key.first() != Some(&b'b') {
            break;
        }
        if key.len() == 33 {
            let hash_bytes: [u8; 32] = key[1..33].try_into().expect("32-byte key tail");
            let hash = BlockHash::from_byte_array(hash_bytes);
            match parse_block_record(&value) {
                Ok(entry) => {
                    entries.insert(hash, entry);
                }
                Err(message) => {
                    tracing::warn!(hash = %hash, message, "skipping unreadable block record");
                }
            }
        }
        if !iter.advance() {
            break;
        }
    }

    // The highest entry is the active tip; hash breaks the (rare) tie so the
    // result is deterministic.
    let Some(tip) = entries
        .iter()
        .max_by_key(|&(hash, entry)| (entry.height, *hash))
        .map(|(hash, _)| *hash)
    else {
        return Ok(Vec::new());
    };

    let mut main_chain = HashSet::new();
    let mut cursor = tip;
    loop {
        main_chain.insert(cursor);
        match entries.get(&cursor) {
            Some(entry) if entry.prev != BlockHash::all_zeros() => cursor = entry.prev,
            _ => break,
        }
    }

    let mut stale: Vec<(u64, BlockHash)> = entries
        .iter()
        .filter(|(hash, entry)| entry.have_data && !main_chain.contains(*hash))
        .map(|(hash, entry)| (entry.height, *hash))
        .collect();
    stale.sort_unstable();

    Ok(stale.into_iter().map(|(_, hash)| hash).collect())
}

/// Decode one `b` record: varints (client version, height, status, tx
/// count, then file/data/undo positions depending on status), followed by
/// the 112-byte header.
fn parse_block_record(value: &[u8]) -> Result<IndexedBlock, String> {
    let mut pos = 0;
    let _client_version = read_index_varint(value, &mut pos)?;
    let height = read_index_varint(value, &mut pos)?;
    let status = read_index_varint(value, &mut pos)?;
    let _tx_count = read_index_varint(value, &mut pos)?;

    if status & (BLOCK_HAVE_DATA | BLOCK_HAVE_UNDO) != 0 {
        let _file = read_index_varint(value, &mut pos)?;
    }
    if status & BLOCK_HAVE_DATA != 0 {
        let _data_pos = read_index_varint(value, &mut pos)?;
    }
    if status & BLOCK_HAVE_UNDO != 0 {
        let _undo_pos = read_index_varint(value, &mut pos)?;
    }

    let header = value
        .get(pos..pos + HEADER_LEN)
        .ok_or_else(|| "record ends before the header".to_string())?;
    let prev_bytes: [u8; 32] = header[4..36].try_into().expect("32-byte slice");

    Ok(IndexedBlock {
        // Kept in digest order to match the record keys while walking.
        prev: BlockHash::from_byte_array(prev_bytes),
        height,
        have_data: status & BLOCK_HAVE_DATA != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::test_support::write_index_varint;
    use crate::test_util::header_bytes;
    use bitcoin::hashes::sha256d;
    use rusty_leveldb::{Options, DB};

    #[test]
    fn compiled_in_table_answers_membership() {
        let known: BlockHash = STALE_BLOCK_HASHES[0].parse().unwrap();
        assert!(is_stale(&known));

        let unknown = BlockHash::from_byte_array([0x5a; 32]);
        assert!(!is_stale(&unknown));
    }

    fn record_value(height: u64, status: u64, header: &[u8; 112]) -> Vec<u8> {
        let mut value = Vec::new();
        write_index_varint(&mut value, 170_003); // client version
        write_index_varint(&mut value, height);
        write_index_varint(&mut value, status);
        write_index_varint(&mut value, 1); // tx count
        if status & (BLOCK_HAVE_DATA | BLOCK_HAVE_UNDO) != 0 {
            write_index_varint(&mut value, 0); // file number
        }
        if status & BLOCK_HAVE_DATA != 0 {
            write_index_varint(&mut value, 8); // data position
        }
        if status & BLOCK_HAVE_UNDO != 0 {
            write_index_varint(&mut value, 8); // undo position
        }
        value.extend_from_slice(header);
        value
    }

    fn put_block(db: &mut DB, height: u64, status: u64, header: &[u8; 112]) -> BlockHash {
        let hash = sha256d::Hash::hash(header);
        let mut key = vec![b'b'];
        key.extend_from_slice(hash.as_byte_array());
        db.put(&key, &record_value(height, status, header)).unwrap();
        hash
    }

    #[test]
    fn refresh_reports_side_branch_blocks_with_data() {
        let dir = tempfile::tempdir().unwrap();
        let stale_hash;
        {
            let mut db =
                DB::open(dir.path().join("index"), Options::default()).expect("create index");

            let zero = [0u8; 32];
            let genesis = header_bytes(1, zero, zero, zero, 0, 0, 0);
            let genesis_hash = put_block(&mut db, 0, BLOCK_HAVE_DATA, &genesis);

            let a = header_bytes(1, *genesis_hash.as_byte_array(), zero, zero, 0, 0, 1);
            let a_hash = put_block(&mut db, 1, BLOCK_HAVE_DATA, &a);

            let b = header_bytes(1, *a_hash.as_byte_array(), zero, zero, 0, 0, 2);
            let b_hash = put_block(&mut db, 2, BLOCK_HAVE_DATA, &b);

            let c = header_bytes(1, *b_hash.as_byte_array(), zero, zero, 0, 0, 3);
            put_block(&mut db, 3, BLOCK_HAVE_DATA, &c);

            // Side branch off A at the same height as B.
            let x = header_bytes(1, *a_hash.as_byte_array(), zero, zero, 0, 0, 99);
            stale_hash = put_block(&mut db, 2, BLOCK_HAVE_DATA, &x);

            // A header-only entry off the main chain must not be reported.
            let y = header_bytes(1, *a_hash.as_byte_array(), zero, zero, 0, 0, 100);
            put_block(&mut db, 2, 0, &y);

            db.flush().expect("flush index");
        }

        let stale = refresh_from_index(dir.path()).expect("refresh");
        assert_eq!(stale, vec![stale_hash]);
    }

    #[test]
    fn refresh_of_empty_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db =
                DB::open(dir.path().join("index"), Options::default()).expect("create index");
            db.flush().unwrap();
        }
        assert!(refresh_from_index(dir.path()).unwrap().is_empty());
    }
}

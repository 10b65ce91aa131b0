//! Block index access.
//!
//! The node keeps a LevelDB database at `{blocks_dir}/index`. Keys prefixed
//! `f` describe one block file each: the key carries the file number, the
//! value a run of varints (block count, file size, undo size, first height,
//! last height, first time, last time). Only the first height matters here —
//! it orders the files for the reader.
//!
//! The varints are Bitcoin's index encoding, not the wire compact size:
//! big-endian base-128 where every continuation also increments the
//! accumulator.

use std::path::Path;

use rusty_leveldb::{LdbIterator, Options, DB};

use crate::error::CoreError;
use crate::types::BlockFileRef;

/// Open the node's block index. The index is required: without it there is
/// no file ordering and no work.
pub(crate) fn open_index(blocks_dir: &Path) -> Result<DB, CoreError> {
    let mut options = Options::default();
    options.create_if_missing = false;
    let db = DB::open(blocks_dir.join("index"), options)?;
    Ok(db)
}

/// Enumerate the node's block files, ordered by the height of the first
/// block each contains.
pub fn block_files_ordered_by_height(blocks_dir: &Path) -> Result<Vec<BlockFileRef>, CoreError> {
    let mut db = open_index(blocks_dir)?;
    let mut iter = db.new_iter()?;
    iter.seek(b"f");

    let mut files = Vec::new();
    let (mut key, mut value) = (Vec::new(), Vec::new());
    while iter.current(&mut key, &mut value) {
        if key.first() != Some(&b'f') {
            break;
        }
        if key.len() != 5 {
            tracing::warn!(key = ?key, "skipping malformed file record key");
            if !iter.advance() {
                break;
            }
            continue;
        }

        let number = u32::from_le_bytes([key[1], key[2], key[3], key[4]]);
        let first_height = first_height_from_record(&value).map_err(|message| {
            CoreError::IndexRecord {
                key: format!("f{number}"),
                message,
            }
        })?;

        files.push(BlockFileRef {
            path: blocks_dir.join(format!("blk{number:05}.dat")),
            first_height,
        });

        if !iter.advance() {
            break;
        }
    }

    files.sort_by_key(|file| file.first_height);
    Ok(files)
}

/// The fourth varint of a file record is the first height.
fn first_height_from_record(value: &[u8]) -> Result<u64, String> {
    let mut pos = 0;
    for _ in 0..3 {
        read_index_varint(value, &mut pos)?;
    }
    read_index_varint(value, &mut pos)
}

/// Decode one index varint at `pos`, advancing past it.
pub(crate) fn read_index_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, String> {
    let mut n: u64 = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| format!("varint truncated at byte {pos}"))?;
        *pos += 1;
        n = (n << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 != 0 {
            n += 1;
        } else {
            return Ok(n);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Inverse of `read_index_varint`, ported from the node's encoder.
    pub(crate) fn write_index_varint(buf: &mut Vec<u8>, mut value: u64) {
        let mut tmp = Vec::new();
        loop {
            let continuation = if tmp.is_empty() { 0x00 } else { 0x80 };
            tmp.push((value & 0x7f) as u8 | continuation);
            if value <= 0x7f {
                break;
            }
            value = (value >> 7) - 1;
        }
        tmp.reverse();
        buf.extend_from_slice(&tmp);
    }

    /// A file record value: block count, file size, undo size, first height,
    /// last height, first time, last time.
    pub(crate) fn file_record(first_height: u64) -> Vec<u8> {
        let mut value = Vec::new();
        for field in [12, 1_000_000, 50_000, first_height, first_height + 11, 0, 0] {
            write_index_varint(&mut value, field);
        }
        value
    }
}

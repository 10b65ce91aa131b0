//! One on-disk `blk#####.dat` as a lazy sequence of blocks.
//!
//! The node appends records of `magic | u32 size | block`, occasionally
//! leaving stretches of zero bytes between them. The file opens on first
//! read, is drained strictly sequentially, and closes itself once exhausted.
//! Truncation anywhere reads as a clean end of file; a non-zero, non-magic
//! byte sequence between records is a framing error carrying the offset.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bytes::{CountingReader, WireRead};
use crate::decode;
use crate::error::{CoreError, DecodeError};
use crate::params::ChainParams;
use crate::types::{hex_string, Block, BlockFileRef};

/// Outcome of the inter-record framing walk.
enum Framing {
    Magic,
    Eof,
    Mismatch { offset: u64, found: [u8; 4] },
}

pub struct BlockFile {
    path: PathBuf,
    first_height: u64,
    reader: Option<CountingReader<BufReader<File>>>,
    closed: bool,
    current_height: u64,
}

impl BlockFile {
    pub fn new(file_ref: BlockFileRef) -> Self {
        Self {
            path: file_ref.path,
            current_height: file_ref.first_height,
            first_height: file_ref.first_height,
            reader: None,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn first_height(&self) -> u64 {
        self.first_height
    }

    /// Read the next block, or `None` once the file is exhausted (after
    /// which the file is closed and further calls fail).
    ///
    /// The block's `height` is a monotonic counter seeded from the file's
    /// first height; blocks are not stored strictly in height order, so it
    /// is approximate.
    pub fn next_block(&mut self, params: &ChainParams) -> Result<Option<Block>, CoreError> {
        if self.closed {
            return Err(CoreError::BlockFileClosed(self.path.clone()));
        }

        if self.reader.is_none() {
            let file = File::open(&self.path)?;
            self.reader = Some(CountingReader::new(BufReader::new(file)));
        }
        let reader = self.reader.as_mut().expect("reader opened above");

        match skip_to_next_record(reader, params.magic)? {
            Framing::Magic => {}
            Framing::Eof => {
                self.close();
                return Ok(None);
            }
            Framing::Mismatch { offset, found } => {
                return Err(CoreError::Framing {
                    file: self.path.clone(),
                    offset,
                    found: hex_string(&found),
                });
            }
        }

        let size = match reader.read_u32_le() {
            Ok(size) => size,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.close();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let start = reader.position();
        let mut block = match decode::read_block(reader, params) {
            Ok(block) => block,
            Err(e) if e.is_eof() => {
                self.close();
                return Ok(None);
            }
            Err(source) => {
                return Err(CoreError::Decode {
                    file: self.path.clone(),
                    offset: start,
                    height: self.current_height,
                    source,
                });
            }
        };

        let consumed = reader.position() - start;
        if consumed != u64::from(size) {
            return Err(CoreError::Decode {
                file: self.path.clone(),
                offset: start,
                height: self.current_height,
                source: DecodeError::SizeMismatch {
                    expected: size,
                    actual: consumed,
                },
            });
        }

        block.size = size;
        block.height = self.current_height;
        self.current_height += 1;

        Ok(Some(block))
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.reader = None;
    }
}

/// Consume bytes up to the next record's magic.
///
/// Fast path: the next four bytes are the magic. The node sometimes pads
/// with zeros, in which case all four are zero; zeros are then consumed one
/// at a time until a non-zero byte starts a new magic candidate. Anything
/// else is a framing error.
fn skip_to_next_record<R: std::io::Read>(
    reader: &mut CountingReader<R>,
    magic: [u8; 4],
) -> Result<Framing, CoreError> {
    let offset = reader.position();
    let head: [u8; 4] = match reader.read_array() {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Framing::Eof),
        Err(e) => return Err(e.into()),
    };

    if head == magic {
        return Ok(Framing::Magic);
    }
    if head != [0, 0, 0, 0] {
        return Ok(Framing::Mismatch {
            offset,
            found: head,
        });
    }

    // Walk the zero padding.
    let first = loop {
        match reader.read_u8() {
            Ok(0) => continue,
            Ok(byte) => break byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Framing::Eof),
            Err(e) => return Err(e.into()),
        }
    };

    let offset = reader.position() - 1;
    let rest: [u8; 3] = match reader.read_array() {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Framing::Eof),
        Err(e) => return Err(e.into()),
    };

    let candidate = [first, rest[0], rest[1], rest[2]];
    if candidate == magic {
        Ok(Framing::Magic)
    } else {
        Ok(Framing::Mismatch {
            offset,
            found: candidate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::MAINNET;
    use crate::test_util::{
        block_bytes, block_record, coinbase_tx_bytes, header_bytes,
    };
    use std::io::Write;

    fn stage_file(contents: &[u8]) -> (tempfile::TempDir, BlockFileRef) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("blk00000.dat");
        let mut file = File::create(&path).expect("create block file");
        file.write_all(contents).expect("write block file");
        (
            dir,
            BlockFileRef {
                path,
                first_height: 100,
            },
        )
    }

    fn one_block() -> Vec<u8> {
        block_bytes(
            &header_bytes(1, [0u8; 32], [0u8; 32], [0u8; 32], 0, 0, 0),
            &[coinbase_tx_bytes(0x11)],
        )
    }

    #[test]
    fn reads_consecutive_records_and_terminates() {
        let mut contents = block_record(MAINNET.magic, &one_block());
        contents.extend_from_slice(&block_record(MAINNET.magic, &one_block()));
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        let first = file.next_block(&MAINNET).unwrap().expect("first block");
        assert_eq!(first.height, 100);
        assert_eq!(first.size as usize, one_block().len());

        let second = file.next_block(&MAINNET).unwrap().expect("second block");
        assert_eq!(second.height, 101);

        assert!(file.next_block(&MAINNET).unwrap().is_none());
        // Exhaustion closes the file.
        assert!(matches!(
            file.next_block(&MAINNET),
            Err(CoreError::BlockFileClosed(_))
        ));
    }

    #[test]
    fn skips_zero_padding_between_records() {
        let mut contents = block_record(MAINNET.magic, &one_block());
        contents.extend_from_slice(&[0u8; 37]);
        contents.extend_from_slice(&block_record(MAINNET.magic, &one_block()));
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        assert!(file.next_block(&MAINNET).unwrap().is_none());
    }

    #[test]
    fn trailing_zeros_terminate_cleanly() {
        let mut contents = block_record(MAINNET.magic, &one_block());
        contents.extend_from_slice(&[0u8; 512]);
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        assert!(file.next_block(&MAINNET).unwrap().is_none());
    }

    #[test]
    fn garbage_between_records_is_a_framing_error() {
        let mut contents = block_record(MAINNET.magic, &one_block());
        let garbage_offset = contents.len() as u64;
        contents.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        match file.next_block(&MAINNET) {
            Err(CoreError::Framing { offset, found, .. }) => {
                assert_eq!(offset, garbage_offset);
                assert_eq!(found, "deadbeef");
            }
            other => panic!("expected framing error, got {other:?}"),
        }
    }

    #[test]
    fn non_magic_after_padding_is_a_framing_error() {
        let mut contents = block_record(MAINNET.magic, &one_block());
        contents.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        contents.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        assert!(matches!(
            file.next_block(&MAINNET),
            Err(CoreError::Framing { .. })
        ));
    }

    #[test]
    fn size_mismatch_is_fatal() {
        let block = one_block();
        let mut contents = Vec::new();
        contents.extend_from_slice(&MAINNET.magic);
        contents.extend_from_slice(&((block.len() + 5) as u32).to_le_bytes());
        contents.extend_from_slice(&block);
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        match file.next_block(&MAINNET) {
            Err(CoreError::Decode {
                source: DecodeError::SizeMismatch { expected, actual },
                ..
            }) => {
                assert_eq!(expected as usize, block.len() + 5);
                assert_eq!(actual as usize, block.len());
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn truncated_final_record_terminates_cleanly() {
        let block = one_block();
        let mut contents = block_record(MAINNET.magic, &block);
        let partial = block_record(MAINNET.magic, &block);
        contents.extend_from_slice(&partial[..partial.len() / 2]);
        let (_dir, file_ref) = stage_file(&contents);

        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_some());
        assert!(file.next_block(&MAINNET).unwrap().is_none());
    }

    #[test]
    fn empty_file_yields_no_blocks() {
        let (_dir, file_ref) = stage_file(&[]);
        let mut file = BlockFile::new(file_ref);
        assert!(file.next_block(&MAINNET).unwrap().is_none());
    }
}

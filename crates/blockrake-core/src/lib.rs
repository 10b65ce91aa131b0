//! Core library for **blockrake** — an offline reader for LBRY block files.
//!
//! This crate turns a node's on-disk chain (`blk#####.dat` plus the LevelDB
//! block index) back into structured blocks, transactions, inputs, and
//! outputs, and streams them to a caller-supplied callback from a pool of
//! per-file workers. On top of the stream sits a UTXO accountant that
//! tolerates the out-of-order spend/create arrivals the parallel readers
//! produce.
//!
//! It is strictly read-only and offline: no peer-to-peer traffic, no
//! consensus validation, no writes to the node's data directory.
//!
//! The pipeline, bottom up:
//!
//! - `bytes`: primitive little-endian and compact-size reads (private).
//! - [`script`]: output script classification, addresses, LBRY claim and
//!   purchase extraction.
//! - [`decode`]: block deserialization and non-witness txid reconstruction.
//! - [`blockfile`]: one `blk#####.dat` as a lazy block sequence.
//! - [`index`]: the node's LevelDB index, ordering files by first height.
//! - [`chain`]: the worker-pool driver and callback surface.
//! - [`accounting`]: the UTXO set with out-of-order tombstones.
//! - [`stale`]: the compiled-in orphaned-block table and offline refresh.

pub mod accounting;
pub mod blockfile;
mod bytes;
pub mod chain;
pub mod decode;
pub mod error;
pub mod index;
pub mod params;
pub mod script;
pub mod stale;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use chain::{Chain, Config};
pub use error::{CoreError, DecodeError};
pub use types::{
    Block, BlockFileRef, BlockHash, Header, Input, Outpoint, Output, Script, Transaction, TxHash,
};

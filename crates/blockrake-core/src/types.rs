//! Domain types for the parsed chain.
//!
//! Blocks own their transactions, transactions own their inputs and outputs;
//! there are no back-references. Consumers that need owner context derive it
//! on access via [`Transaction::outpoints`] or carry `(block, tx)` locals in
//! their callbacks.

use std::fmt;
use std::path::PathBuf;

use bitcoin::hashes::{sha256d, Hash};

use crate::script::claim::ClaimScript;
use crate::script::purchase::Purchase;
use crate::script::ScriptClass;

/// Double-SHA-256 block hash. `Display` renders the conventional
/// byte-reversed (big-endian) hex form.
pub type BlockHash = sha256d::Hash;

/// Double-SHA-256 transaction id over the non-witness serialization.
pub type TxHash = sha256d::Hash;

/// One witness stack: the per-input list of witness items.
pub type WitnessStack = Vec<Vec<u8>>;

/// Render bytes as lowercase hex.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    use fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        write!(s, "{b:02x}").expect("writing to a String cannot fail");
        s
    })
}

// ==============================================================================
// Script
// ==============================================================================

/// Raw script bytes. `Display` is the hex form, which is how scripts appear
/// in logs and extractor output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_string(&self.0))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex_string(&self.0))
    }
}

// ==============================================================================
// Block File Reference
// ==============================================================================

/// One `blk#####.dat` file as listed by the node's block index.
///
/// `first_height` is the height of the lowest block the file contains. Blocks
/// inside the file are *not* strictly height-ordered, so it is a lower bound,
/// not a promise about record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFileRef {
    pub path: PathBuf,
    pub first_height: u64,
}

// ==============================================================================
// Header and Block
// ==============================================================================

/// Parsed 112-byte LBRY block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    /// Previous block hash, byte-reversed from its wire order.
    pub prev_hash: BlockHash,
    pub merkle_root: [u8; 32],
    /// Root of the claim trie, the LBRY extension over Bitcoin's header.
    pub claim_trie_root: [u8; 32],
    /// Unix seconds.
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    /// Double-SHA-256 of the 112 header bytes.
    pub block_hash: BlockHash,
}

/// A fully decoded block.
#[derive(Debug, Clone)]
pub struct Block {
    /// Byte length of the block record, from the file framing.
    pub size: u32,
    /// Approximate height: a monotonic counter seeded from the file's
    /// `first_height`. Blocks are not strictly height-ordered within a file,
    /// so treat this as a label, not a coordinate.
    pub height: u64,
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

// ==============================================================================
// Transaction, Input, Output
// ==============================================================================

#[derive(Debug, Clone)]
pub struct Transaction {
    pub version: u32,
    pub is_segwit: bool,
    /// Double-SHA-256 of the non-witness serialization.
    pub hash: TxHash,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// One stack per input; empty unless `is_segwit`.
    pub witnesses: Vec<WitnessStack>,
    /// Unix seconds (or a block height below the locktime threshold).
    pub lock_time: u32,
}

impl Transaction {
    /// Outputs paired with the outpoints that reference them. This is the
    /// owner-context carrier: outputs do not point back at their transaction.
    pub fn outpoints(&self) -> impl Iterator<Item = (Outpoint, &Output)> {
        let txid = self.hash;
        self.outputs
            .iter()
            .enumerate()
            .map(move |(n, out)| (Outpoint { txid, nout: n as u32 }, out))
    }
}

#[derive(Debug, Clone)]
pub struct Input {
    /// Hash of the transaction whose output this input spends.
    pub prev_tx_hash: TxHash,
    /// Output position within that transaction.
    pub prev_tx_index: u32,
    pub script: Script,
    /// Sequence field, surfaced byte-reversed from its wire order.
    pub sequence: u32,
}

impl Input {
    /// A coinbase input references no previous output: its prev hash is all
    /// zero.
    pub fn is_coinbase(&self) -> bool {
        self.prev_tx_hash == TxHash::all_zeros()
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    /// Value in deweys (10^8 deweys = 1 LBC).
    pub amount: u64,
    pub pk_script: Script,
    pub script_class: ScriptClass,
    /// Encoded address, present when the script yields exactly one.
    pub address: Option<String>,
    /// Present when the script carries an LBRY claim prefix.
    pub claim: Option<ClaimScript>,
    /// Present when the script is an OP_RETURN purchase marker.
    pub purchase: Option<Purchase>,
}

// ==============================================================================
// Outpoint
// ==============================================================================

/// Canonical reference to one output: `(txid, output index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    pub txid: TxHash,
    pub nout: u32,
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.nout)
    }
}

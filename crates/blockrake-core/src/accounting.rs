//! UTXO accounting over the parallel block stream.
//!
//! The reader's workers emit spend and create events in no particular global
//! order: a spend of output O can arrive before the create of O when the two
//! live in different block files. The accountant tolerates that with a
//! tombstone ("predelete") set — a spend with no matching unspent output is
//! remembered, and the create, when it arrives, cancels against it instead
//! of entering the set.
//!
//! Correctness leans only on the chain's per-outpoint ordering (an output is
//! created exactly once and spent at most once), never on event delivery
//! order. The accountant itself is single-threaded: producers serialize
//! through one channel.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;

use crate::error::CoreError;
use crate::types::Outpoint;

// ==============================================================================
// Events
// ==============================================================================

/// One accounting event. Producers must filter coinbase inputs; a coinbase
/// spend references no output.
#[derive(Debug, Clone)]
pub enum Event {
    /// An input consumed `outpoint`.
    Spend(Outpoint),
    /// An output created `outpoint` paying `amount` to `address`.
    Create {
        outpoint: Outpoint,
        address: String,
        amount: u64,
    },
    /// Fold the current set into per-address balances and write them as a
    /// two-column CSV (no header) at `path`.
    Snapshot { height: u64, path: PathBuf },
}

/// What the accountant saw by the time its channel closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Outputs still unspent.
    pub unspent: usize,
    /// Spends that never saw their create. Non-empty means the scan was
    /// height-capped below the creating block, or incomplete.
    pub unmatched_spends: usize,
}

// ==============================================================================
// Accountant
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Utxo {
    address: String,
    amount: u64,
}

/// The unspent-output set plus the out-of-order tombstones.
#[derive(Debug, Default)]
pub struct Accountant {
    utxos: HashMap<Outpoint, Utxo>,
    predeleted: HashSet<Outpoint>,
}

impl Accountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume events until every sender is dropped, then report.
    pub fn run(mut self, events: Receiver<Event>) -> Summary {
        for event in events {
            self.apply(event);
        }

        if !self.predeleted.is_empty() {
            tracing::warn!(
                count = self.predeleted.len(),
                "spends without a matching create at shutdown"
            );
        }

        Summary {
            unspent: self.utxos.len(),
            unmatched_spends: self.predeleted.len(),
        }
    }

    /// Apply one event. Maintains the invariant that no outpoint is ever in
    /// both the unspent set and the tombstone set.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Create {
                outpoint,
                address,
                amount,
            } => {
                if self.predeleted.remove(&outpoint) {
                    // The spend already went through; net effect is nothing.
                    tracing::debug!(%outpoint, "create matched an earlier spend");
                } else {
                    self.utxos.insert(outpoint, Utxo { address, amount });
                }
            }
            Event::Spend(outpoint) => {
                if self.utxos.remove(&outpoint).is_none() {
                    tracing::debug!(%outpoint, "spend before create, tombstoning");
                    self.predeleted.insert(outpoint);
                }
            }
            Event::Snapshot { height, path } => {
                tracing::info!(height, path = %path.display(), "writing balance snapshot");
                if let Err(err) = self.write_snapshot(&path) {
                    // Snapshots are best-effort; the scan keeps going.
                    tracing::error!(height, error = %err, "balance snapshot failed");
                }
            }
        }
    }

    /// Fold the unspent set into per-address balances. The empty address
    /// (outputs whose script yielded none) keeps its own bucket here.
    pub fn balances(&self) -> HashMap<String, u64> {
        let mut balances: HashMap<String, u64> = HashMap::new();
        for utxo in self.utxos.values() {
            *balances.entry(utxo.address.clone()).or_insert(0) += utxo.amount;
        }
        balances
    }

    fn write_snapshot(&self, path: &Path) -> Result<(), CoreError> {
        let snapshot_err = |source: csv::Error| CoreError::Snapshot {
            path: path.to_path_buf(),
            source,
        };

        let mut balances = self.balances();
        if let Some(unattributed) = balances.remove("") {
            *balances.entry("unknown".to_string()).or_insert(0) += unattributed;
        }

        let mut writer = csv::Writer::from_path(path).map_err(snapshot_err)?;
        for (address, amount) in &balances {
            let amount = amount.to_string();
            writer
                .write_record([address.as_str(), amount.as_str()])
                .map_err(snapshot_err)?;
        }
        writer.flush().map_err(|e| snapshot_err(e.into()))?;
        Ok(())
    }

    // Introspection used by consumers reporting state and by tests.

    pub fn unspent_count(&self) -> usize {
        self.utxos.len()
    }

    pub fn predeleted_count(&self) -> usize {
        self.predeleted.len()
    }

    pub fn is_unspent(&self, outpoint: &Outpoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn is_predeleted(&self, outpoint: &Outpoint) -> bool {
        self.predeleted.contains(outpoint)
    }
}

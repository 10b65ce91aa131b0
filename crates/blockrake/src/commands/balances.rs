//! Balance snapshots: replay the chain into the UTXO accountant and dump
//! per-address balances at the requested heights.

use std::collections::HashSet;
use std::path::Path;

use blockrake_core::accounting::{Accountant, Event};
use blockrake_core::{stale, Outpoint};
use eyre::WrapErr;

use crate::cli::ScanArgs;
use crate::commands::open_chain;

/// Bounded queue between the reader workers and the single accountant; a
/// slow accountant back-pressures the readers instead of buffering blocks.
const EVENT_QUEUE: usize = 1024;

pub fn run(scan: &ScanArgs, report_heights: &[u64], out_dir: &Path) -> eyre::Result<()> {
    let chain = open_chain(scan)?;
    let report: HashSet<u64> = report_heights.iter().copied().collect();
    let out_dir = out_dir.to_path_buf();

    let (event_tx, event_rx) = crossbeam_channel::bounded::<Event>(EVENT_QUEUE);
    let accountant = std::thread::spawn(move || Accountant::new().run(event_rx));

    let result = chain.load(move |block| {
        if stale::is_stale(&block.header.block_hash) {
            return;
        }
        tracing::debug!(height = block.height, hash = %block.header.block_hash, "block");

        for tx in &block.transactions {
            for input in &tx.inputs {
                // A coinbase input spends nothing.
                if input.is_coinbase() {
                    continue;
                }
                let _ = event_tx.send(Event::Spend(Outpoint {
                    txid: input.prev_tx_hash,
                    nout: input.prev_tx_index,
                }));
            }
            for (outpoint, output) in tx.outpoints() {
                // The decoder already warned about address-less standard
                // outputs; they simply carry no balance here.
                let Some(address) = output.address.clone() else {
                    continue;
                };
                let _ = event_tx.send(Event::Create {
                    outpoint,
                    address,
                    amount: output.amount,
                });
            }
        }

        if report.contains(&block.height) {
            let path = out_dir.join(format!("balances_{}.csv", block.height));
            let _ = event_tx.send(Event::Snapshot {
                height: block.height,
                path,
            });
        }
    });
    // `load` dropped the callback and with it the last sender; the
    // accountant drains whatever is queued and exits.
    let summary = accountant.join().expect("accountant thread panicked");

    result.wrap_err("chain scan failed; snapshots are incomplete")?;
    tracing::info!(
        unspent = summary.unspent,
        unmatched_spends = summary.unmatched_spends,
        "balance accounting complete"
    );
    Ok(())
}

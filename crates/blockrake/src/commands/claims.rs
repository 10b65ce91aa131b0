//! Claim-address extraction: the addresses claim and purchase outputs pay
//! to, and the input outpoints of the transactions that carry them. Inputs
//! of such "consumptive" transactions belong to real users, which makes
//! both lists useful seeds for address clustering.
//!
//! Claim values are not decoded here — only the script-level presence of a
//! claim or purchase matters.

use std::collections::HashSet;
use std::path::Path;

use blockrake_core::stale;
use eyre::WrapErr;

use crate::cli::ScanArgs;
use crate::commands::addresses::write_lines;
use crate::commands::{open_chain, unix_timestamp};

enum Found {
    Address(String),
    InputOutpoint(String),
}

pub fn run(scan: &ScanArgs, out_dir: &Path) -> eyre::Result<()> {
    let chain = open_chain(scan)?;

    let (found_tx, found_rx) = crossbeam_channel::bounded::<Found>(1024);
    let collector = std::thread::spawn(move || {
        let mut addresses: HashSet<String> = HashSet::new();
        let mut outpoints: Vec<String> = Vec::new();
        for found in found_rx {
            match found {
                Found::Address(address) => {
                    addresses.insert(address);
                }
                Found::InputOutpoint(outpoint) => outpoints.push(outpoint),
            }
        }
        (addresses, outpoints)
    });

    let result = chain.load(move |block| {
        if stale::is_stale(&block.header.block_hash) {
            return;
        }
        for tx in &block.transactions {
            let mut has_consumptive_use = false;
            for (_, output) in tx.outpoints() {
                if output.claim.is_some() {
                    has_consumptive_use = true;
                    if let Some(address) = &output.address {
                        let _ = found_tx.send(Found::Address(address.clone()));
                    }
                } else if output.purchase.is_some() {
                    has_consumptive_use = true;
                }
            }
            if !has_consumptive_use {
                continue;
            }

            // A transaction with a claim was assembled by its owner, so its
            // inputs point at that user's own prior outputs.
            for input in &tx.inputs {
                let _ = found_tx.send(Found::InputOutpoint(format!(
                    "{}:{}",
                    input.prev_tx_hash, input.prev_tx_index
                )));
            }
        }
    });
    let (addresses, outpoints) = collector.join().expect("collector thread panicked");
    result.wrap_err("chain scan failed")?;

    let stamp = unix_timestamp();
    if !addresses.is_empty() {
        let path = out_dir.join(format!("addresses_{stamp}"));
        write_lines(&path, addresses.iter())
            .wrap_err_with(|| format!("write address list {}", path.display()))?;
    }
    if !outpoints.is_empty() {
        let path = out_dir.join(format!("outpoints_{stamp}"));
        write_lines(&path, outpoints.iter())
            .wrap_err_with(|| format!("write outpoint list {}", path.display()))?;
    }

    tracing::info!(
        addresses = addresses.len(),
        outpoints = outpoints.len(),
        "collected claim addresses and consumptive outpoints"
    );
    Ok(())
}

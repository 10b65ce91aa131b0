//! Raw parse benchmark: run the whole pipeline with an empty callback and
//! report throughput.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use eyre::WrapErr;

use crate::cli::ScanArgs;
use crate::commands::open_chain;

pub fn run(scan: &ScanArgs) -> eyre::Result<()> {
    let chain = open_chain(scan)?;

    let blocks = AtomicU64::new(0);
    let transactions = AtomicU64::new(0);
    let started = Instant::now();

    chain
        .load(|block| {
            blocks.fetch_add(1, Ordering::Relaxed);
            transactions.fetch_add(block.transactions.len() as u64, Ordering::Relaxed);
        })
        .wrap_err("chain scan failed")?;

    let elapsed = started.elapsed();
    let blocks = blocks.into_inner();
    let transactions = transactions.into_inner();
    let rate = blocks as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!(
        "parsed {blocks} blocks / {transactions} transactions in {:.1}s ({rate:.0} blocks/s, {} workers)",
        elapsed.as_secs_f64(),
        scan.workers,
    );
    Ok(())
}

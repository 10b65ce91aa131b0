//! Address extraction: every output address seen on the chain, optionally
//! restricted to a list of outpoints of interest.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use blockrake_core::stale;
use eyre::WrapErr;

use crate::cli::ScanArgs;
use crate::commands::{open_chain, unix_timestamp};

pub fn run(scan: &ScanArgs, outpoints_file: Option<&Path>, out_dir: &Path) -> eyre::Result<()> {
    let chain = open_chain(scan)?;

    let filter = match outpoints_file {
        Some(path) => {
            let outpoints = load_outpoint_list(path)
                .wrap_err_with(|| format!("load outpoint list {}", path.display()))?;
            tracing::info!(count = outpoints.len(), "loaded outpoint filter");
            Some(outpoints)
        }
        None => None,
    };

    let (addr_tx, addr_rx) = crossbeam_channel::bounded::<String>(1024);
    let collector = std::thread::spawn(move || {
        let mut addresses: HashSet<String> = HashSet::new();
        for address in addr_rx {
            addresses.insert(address);
        }
        addresses
    });

    let result = chain.load(move |block| {
        if stale::is_stale(&block.header.block_hash) {
            return;
        }
        for tx in &block.transactions {
            for (outpoint, output) in tx.outpoints() {
                let Some(address) = &output.address else {
                    continue;
                };
                if let Some(wanted) = &filter {
                    if !wanted.contains(&outpoint.to_string()) {
                        continue;
                    }
                }
                let _ = addr_tx.send(address.clone());
            }
        }
    });
    let addresses = collector.join().expect("collector thread panicked");
    result.wrap_err("chain scan failed")?;

    let path = out_dir.join(format!("addresses_{}", unix_timestamp()));
    write_lines(&path, addresses.iter())
        .wrap_err_with(|| format!("write address list {}", path.display()))?;
    tracing::info!(count = addresses.len(), path = %path.display(), "collected addresses");
    Ok(())
}

fn load_outpoint_list(path: &Path) -> eyre::Result<HashSet<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut outpoints = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            outpoints.insert(trimmed.to_string());
        }
    }
    Ok(outpoints)
}

pub(crate) fn write_lines<'a>(
    path: &Path,
    lines: impl Iterator<Item = &'a String>,
) -> eyre::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

//! Print the current orphaned-block set, derived offline from the node's
//! index. The output is the raw material for the compiled-in stale table.

use std::path::Path;

use eyre::WrapErr;

pub fn run(blocks_dir: &Path) -> eyre::Result<()> {
    let hashes = blockrake_core::stale::refresh_from_index(blocks_dir)
        .wrap_err("enumerate orphaned blocks from the index")?;

    for hash in &hashes {
        println!("{hash}");
    }
    tracing::info!(count = hashes.len(), "orphaned blocks enumerated");
    Ok(())
}

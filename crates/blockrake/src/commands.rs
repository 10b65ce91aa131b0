//! Subcommand drivers. Each is a thin consumer of the core's `on_block`
//! callback; the heavy lifting lives in blockrake-core.

pub mod addresses;
pub mod balances;
pub mod bench;
pub mod claims;
pub mod stale;

use blockrake_core::{Chain, Config};
use eyre::WrapErr;

use crate::cli::ScanArgs;

/// Open the chain for a scanning subcommand.
pub(crate) fn open_chain(scan: &ScanArgs) -> eyre::Result<Chain> {
    Chain::new(Config {
        blocks_dir: scan.blocks_dir.clone(),
        workers: scan.workers,
        max_height: scan.max_height,
    })
    .wrap_err("open block index")
}

/// Seconds since the Unix epoch, used to stamp extractor output files.
pub(crate) fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before the Unix epoch")
        .as_secs()
}

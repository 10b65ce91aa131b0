use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

fn parse_nonzero_usize(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n == 0 {
        return Err("value must be at least 1".to_string());
    }
    Ok(n)
}

/// blockrake — read an LBRY chain straight off the node's block files.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every scanning subcommand.
#[derive(Args)]
pub struct ScanArgs {
    /// The node's blocks directory: blk#####.dat files plus the index database.
    #[arg(long, env = "BLOCKRAKE_BLOCKS_DIR", help_heading = "Chain")]
    pub blocks_dir: PathBuf,

    /// Parallel block file workers (must be at least 1).
    #[arg(
        long,
        default_value = "1",
        value_parser = parse_nonzero_usize,
        env = "BLOCKRAKE_WORKERS",
        help_heading = "Chain"
    )]
    pub workers: usize,

    /// Skip block files whose first height exceeds this (0 = no limit).
    #[arg(long, default_value = "0", help_heading = "Chain")]
    pub max_height: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay the chain into a UTXO set and write per-address balance
    /// snapshots at the requested heights.
    Balances {
        #[command(flatten)]
        scan: ScanArgs,

        /// Height to snapshot at (repeatable). Snapshot files are named
        /// balances_{height}.csv.
        #[arg(long = "report-height", required = true, help_heading = "Output")]
        report_heights: Vec<u64>,

        /// Directory snapshot files are written into.
        #[arg(long, default_value = ".", help_heading = "Output")]
        out_dir: PathBuf,
    },

    /// Collect output addresses, one per line, into addresses_{timestamp}.
    Addresses {
        #[command(flatten)]
        scan: ScanArgs,

        /// Only collect addresses of outputs whose outpoint (txid:nout)
        /// appears in this file, one per line.
        #[arg(long, help_heading = "Filter")]
        outpoints_file: Option<PathBuf>,

        /// Directory the address list is written into.
        #[arg(long, default_value = ".", help_heading = "Output")]
        out_dir: PathBuf,
    },

    /// Collect the addresses of claim and purchase outputs, plus the input
    /// outpoints of the transactions carrying them.
    ClaimAddresses {
        #[command(flatten)]
        scan: ScanArgs,

        /// Directory the address and outpoint lists are written into.
        #[arg(long, default_value = ".", help_heading = "Output")]
        out_dir: PathBuf,
    },

    /// Parse the whole chain with an empty callback and report wall time.
    Bench {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Re-enumerate orphaned block hashes from the node's index and print
    /// them, one per line.
    StaleBlocks {
        /// The node's blocks directory.
        #[arg(long, env = "BLOCKRAKE_BLOCKS_DIR")]
        blocks_dir: PathBuf,
    },
}

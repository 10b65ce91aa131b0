mod cli;
mod commands;

use clap::Parser;

fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_level(true)
        .init();

    match args.command {
        cli::Command::Balances {
            scan,
            report_heights,
            out_dir,
        } => commands::balances::run(&scan, &report_heights, &out_dir),
        cli::Command::Addresses {
            scan,
            outpoints_file,
            out_dir,
        } => commands::addresses::run(&scan, outpoints_file.as_deref(), &out_dir),
        cli::Command::ClaimAddresses { scan, out_dir } => {
            commands::claims::run(&scan, &out_dir)
        }
        cli::Command::Bench { scan } => commands::bench::run(&scan),
        cli::Command::StaleBlocks { blocks_dir } => commands::stale::run(&blocks_dir),
    }
}

//! Driver binary: parses the command line, builds the immutable job
//! configuration, runs the engine, and maps the outcome to exit codes.
//!
//! Exit codes: 0 on success, 1 on job failure, 2 on usage errors (clap's
//! native usage exit code).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use marketcap::config::JobConfig;
use marketcap::currency::Locale;
use marketcap::engine::run_job;
use marketcap::job::{market_cap_pipeline, STOCK_SYMBOLS_COUNTER};

#[derive(Parser)]
#[command(
    name = "marketcap",
    about = "Highest market capitalization per stock symbol over a daily-price history"
)]
struct Cli {
    /// Input location: a NASDAQ/NYSE daily-prices CSV file, or a directory
    /// of them.
    input: PathBuf,

    /// Output location: a directory of part-* files. Deleted recursively
    /// first if it already exists.
    output: PathBuf,

    /// Locale for currency formatting (en-US or de-DE).
    #[arg(long, default_value_t = Locale::EnUs)]
    locale: Locale,

    /// Worker threads for the transform phase.
    #[arg(long, default_value_t = 4)]
    transform_workers: usize,

    /// Worker threads for the fold phase; also the number of output shards.
    #[arg(long, default_value_t = 4)]
    fold_workers: usize,

    /// Records handed to one transform worker at a time.
    #[arg(long, default_value_t = 64 * 1024)]
    partition_size: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = JobConfig::new(cli.input, cli.output)
        .with_locale(cli.locale)
        .with_workers(cli.transform_workers, cli.fold_workers)
        .with_partition_size(cli.partition_size);

    match run_job(market_cap_pipeline(), &config) {
        Ok(summary) => {
            info!(
                counter = STOCK_SYMBOLS_COUNTER,
                value = summary.stock_symbols,
                "distinct symbols"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("job failed: {err}");
            ExitCode::from(1)
        }
    }
}

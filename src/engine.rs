//! The local execution engine: runs a pipeline's transform phase over
//! partitioned input on a worker pool, enforces the grouping barrier, then
//! runs the fold phase on a second pool and merges the per-worker counter
//! contributions.

use std::any::Any;
use std::panic;
use std::path::Path;
use std::sync::mpsc::{channel, sync_channel};

use scoped_threadpool::Pool;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::JobConfig;
use crate::currency::Locale;
use crate::group::{group_by_symbol, ShardRouter};
use crate::input::{self, ParseError};
use crate::output::{prepare_output_dir, ShardWriter};
use crate::pipeline::Pipeline;
use crate::record::{CapitalizationSample, OutputEmitter, PriceRecord, SampleEmitter};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("cannot prepare output location {}: {source}", .path.display())]
    PrepareOutput {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write output shard {shard}: {source}")]
    WriteShard {
        shard: usize,
        source: std::io::Error,
    },
    #[error("{phase} worker panicked: {message}")]
    Worker {
        phase: &'static str,
        message: String,
    },
}

/// Renders a worker's panic payload so it can travel inside [`JobError`].
fn describe_panic(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// What a completed job reports back to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobSummary {
    /// Final value of the `STOCK_SYMBOLS` counter: the number of distinct
    /// symbols seen in the input.
    pub stock_symbols: u64,
    /// Number of `part-*` files written.
    pub output_shards: usize,
}

/// Runs one job to completion: clears the output location, transforms all
/// input partitions in parallel, waits for the grouping barrier, folds each
/// shard in parallel, and merges the counter contributions.
///
/// A panicking worker fails the job with [`JobError::Worker`] rather than
/// unwinding through the driver.
pub fn run_job<P: Pipeline>(pipeline: P, config: &JobConfig) -> Result<JobSummary, JobError> {
    prepare_output_dir(&config.output).map_err(|source| JobError::PrepareOutput {
        path: config.output.clone(),
        source,
    })?;

    let reader = input::open(&config.input)?;
    let router = run_transform_phase(&pipeline, config, reader)?;
    // All transform workers have been joined: every symbol's sample sequence
    // is complete. Only now may the fold phase start.
    debug!("grouping barrier reached");

    let stock_symbols = run_fold_phase(&pipeline, config, router)?;

    info!(stock_symbols, shards = config.fold_workers, "job complete");
    Ok(JobSummary {
        stock_symbols,
        output_shards: config.fold_workers,
    })
}

/// Pulls up to `size` records off the input, failing on the first parse
/// error.
fn next_partition<I>(reader: &mut I, size: usize) -> Result<Vec<PriceRecord>, ParseError>
where
    I: Iterator<Item = Result<PriceRecord, ParseError>>,
{
    let mut partition = Vec::with_capacity(size.min(4096));
    for result in reader.by_ref().take(size) {
        partition.push(result?);
    }
    Ok(partition)
}

fn transform_partition<P: Pipeline>(
    pipeline: &P,
    partition: Vec<PriceRecord>,
    shards: usize,
) -> ShardRouter {
    let mut em = SampleEmitter::new();
    for record in &partition {
        pipeline.transform(&mut em, record);
    }
    let mut router = ShardRouter::new(shards);
    router.route(em.into_samples(), |symbol| pipeline.shard(shards, symbol));
    router
}

fn run_transform_phase<P, I>(
    pipeline: &P,
    config: &JobConfig,
    mut reader: I,
) -> Result<ShardRouter, JobError>
where
    P: Pipeline,
    I: Iterator<Item = Result<PriceRecord, ParseError>>,
{
    let shards = config.fold_workers;
    let mut partitions_run = 0usize;
    let mut read_err: Option<ParseError> = None;

    let (router_tx, router_rx) = channel::<Result<ShardRouter, JobError>>();
    let mut pool = Pool::new(config.transform_workers as u32);
    // Ticketing as a backpressure valve: at most one pending partition per
    // worker is held in memory.
    let (ticket_tx, ticket_rx) = sync_channel::<()>(config.transform_workers);
    for _ in 0..config.transform_workers {
        let _ = ticket_tx.send(());
    }

    pool.scoped(|scope| {
        loop {
            let _ = ticket_rx.recv();

            let partition = match next_partition(&mut reader, config.partition_size) {
                Ok(p) => p,
                Err(e) => {
                    read_err = Some(e);
                    break;
                }
            };
            if partition.is_empty() {
                break;
            }

            let worker_pipeline = pipeline.clone();
            let tx = router_tx.clone();
            let done = ticket_tx.clone();
            scope.execute(move || {
                let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                    transform_partition(&worker_pipeline, partition, shards)
                }))
                .map_err(|payload| JobError::Worker {
                    phase: "transform",
                    message: describe_panic(payload),
                });
                let _ = tx.send(result);
                let _ = done.send(());
            });
            partitions_run += 1;
        }

        scope.join_all();
    });
    drop(router_tx);

    if let Some(e) = read_err {
        return Err(e.into());
    }

    let mut router = ShardRouter::new(shards);
    for result in router_rx {
        router.absorb(result?);
    }
    debug!(partitions = partitions_run, "transform phase complete");
    Ok(router)
}

fn fold_shard<P: Pipeline>(
    pipeline: &P,
    shard: usize,
    samples: Vec<CapitalizationSample>,
    locale: Locale,
    out_dir: &Path,
) -> Result<u64, JobError> {
    let as_write_err = |source| JobError::WriteShard { shard, source };

    let mut writer = ShardWriter::create(out_dir, shard).map_err(as_write_err)?;
    let mut counted = 0u64;
    for group in group_by_symbol(samples) {
        let mut em = OutputEmitter::new();
        counted += pipeline.fold(&mut em, group, locale);
        for record in em.into_records() {
            writer.write_record(&record).map_err(as_write_err)?;
        }
    }
    writer.finish().map_err(as_write_err)?;
    Ok(counted)
}

fn run_fold_phase<P: Pipeline>(
    pipeline: &P,
    config: &JobConfig,
    router: ShardRouter,
) -> Result<u64, JobError> {
    let locale = config.locale;
    let out_dir = config.output.as_path();

    let (result_tx, result_rx) = channel::<Result<u64, JobError>>();
    let mut pool = Pool::new(config.fold_workers as u32);

    pool.scoped(|scope| {
        for (shard, samples) in router.into_shards().into_iter().enumerate() {
            let worker_pipeline = pipeline.clone();
            let tx = result_tx.clone();
            scope.execute(move || {
                let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
                    fold_shard(&worker_pipeline, shard, samples, locale, out_dir)
                }))
                .unwrap_or_else(|payload| {
                    Err(JobError::Worker {
                        phase: "fold",
                        message: describe_panic(payload),
                    })
                });
                let _ = tx.send(result);
            });
        }
    });
    drop(result_tx);

    // Counter merge: per-shard partial counts, summed. Commutative and
    // associative, so worker completion order is irrelevant.
    let mut stock_symbols = 0u64;
    for result in result_rx {
        stock_symbols += result?;
    }
    Ok(stock_symbols)
}

//! Job configuration.

use std::path::PathBuf;

use crate::currency::Locale;

/// Everything a job run needs, decided once up front. There is no mutation
/// after construction; the engine only ever borrows it.
#[derive(Clone, Debug)]
pub struct JobConfig {
    /// Input location: a daily-prices file, or a directory of them.
    pub input: PathBuf,
    /// Output location: a directory, recursively deleted if it exists.
    pub output: PathBuf,
    /// Locale used for currency formatting at emission.
    pub locale: Locale,
    /// Worker threads in the transform phase.
    pub transform_workers: usize,
    /// Worker threads in the fold phase; also the number of shards and of
    /// `part-*` output files.
    pub fold_workers: usize,
    /// Records handed to one transform worker at a time.
    pub partition_size: usize,
}

impl JobConfig {
    pub fn new(input: PathBuf, output: PathBuf) -> JobConfig {
        JobConfig {
            input,
            output,
            locale: Locale::EnUs,
            transform_workers: 4,
            fold_workers: 4,
            partition_size: 64 * 1024,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> JobConfig {
        self.locale = locale;
        self
    }

    /// Sets worker counts for both phases. Clamped to at least one each.
    pub fn with_workers(mut self, transform: usize, fold: usize) -> JobConfig {
        self.transform_workers = transform.max(1);
        self.fold_workers = fold.max(1);
        self
    }

    /// Sets how many records a transform worker receives per partition.
    /// Clamped to at least one.
    pub fn with_partition_size(mut self, size: usize) -> JobConfig {
        self.partition_size = size.max(1);
        self
    }
}

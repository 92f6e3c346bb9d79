//! The transform/fold seams of the pipeline, and the default sharding
//! function that routes a symbol to its fold shard.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::currency::Locale;
use crate::record::{OutputEmitter, PriceRecord, SampleEmitter, SymbolSamples};

/// Transform function type. The emitter argument is used to emit
/// (symbol, capitalization) samples derived from the record.
pub type TransformF = fn(&mut SampleEmitter, &PriceRecord);

/// Fold function type. Consumes one symbol's complete sample sequence,
/// emits final records through the emitter, and returns its contribution to
/// the distinct-symbol counter.
pub type FoldF = fn(&mut OutputEmitter, SymbolSamples, Locale) -> u64;

/// A function used to determine the shard a symbol belongs in. The first
/// argument is the number of shards; the return value is in `[0, n)`.
pub type SharderF = fn(usize, &str) -> usize;

/// Default sharding function. Deterministic for a given binary, so repeated
/// runs produce identical shard layouts.
pub fn shard_for_symbol(n: usize, symbol: &str) -> usize {
    debug_assert!(n > 0);
    let mut h = DefaultHasher::new();
    symbol.hash(&mut h);
    (h.finish() % n as u64) as usize
}

/// A pipeline is the pluggable pair of stages the engine executes: a pure
/// per-record transform and a per-symbol fold, plus the shard assignment
/// that connects them. Implementations are cloned into every worker.
pub trait Pipeline: Send + Clone {
    /// Derives zero or more samples from one price record. Must be pure:
    /// no retained state, no side effects beyond the emitter, no dependence
    /// on invocation order or input partition.
    fn transform(&self, em: &mut SampleEmitter, record: &PriceRecord);

    /// Reduces one symbol's complete sample sequence. Must be insensitive to
    /// the order of the values (the grouping step makes no ordering
    /// guarantee). Returns the number of distinct symbols folded, merged by
    /// summation across workers.
    fn fold(&self, em: &mut OutputEmitter, group: SymbolSamples, locale: Locale) -> u64;

    /// Maps a symbol to a shard in `[0, shards)`. Every worker must agree on
    /// this assignment; the default is a plain hash.
    fn shard(&self, shards: usize, symbol: &str) -> usize {
        shard_for_symbol(shards, symbol)
    }
}

/// A pipeline built from supplied transform/fold functions. Use this to run
/// plain functions through the engine; implement [`Pipeline`] directly if
/// you need more flexibility.
#[derive(Clone, Copy)]
pub struct ClosurePipeline {
    transform: TransformF,
    fold: FoldF,
    sharder: SharderF,
}

impl ClosurePipeline {
    pub fn new(transform: TransformF, fold: FoldF) -> ClosurePipeline {
        ClosurePipeline {
            transform,
            fold,
            sharder: shard_for_symbol,
        }
    }

    /// Replaces the sharding function.
    pub fn with_sharder(mut self, sharder: SharderF) -> ClosurePipeline {
        self.sharder = sharder;
        self
    }
}

impl Pipeline for ClosurePipeline {
    fn transform(&self, em: &mut SampleEmitter, record: &PriceRecord) {
        (self.transform)(em, record)
    }

    fn fold(&self, em: &mut OutputEmitter, group: SymbolSamples, locale: Locale) -> u64 {
        (self.fold)(em, group, locale)
    }

    fn shard(&self, shards: usize, symbol: &str) -> usize {
        (self.sharder)(shards, symbol)
    }
}

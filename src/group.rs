//! The grouping/shuffle step between the transform and fold phases.
//!
//! The fold depends on one guarantee from this module, and only one: for
//! every distinct symbol in the input, all samples carrying that symbol,
//! no matter which transform worker produced them, end up in a single
//! [`SymbolSamples`] group handed to exactly one fold invocation, and that
//! group is complete (no late-arriving sample) before the fold starts.
//! Nothing is promised about the order of values inside a group, which is
//! why the fold must accumulate commutatively and associatively.
//!
//! The mechanism here is the in-memory realization of that contract:
//! transform workers route their samples into per-shard buffers by a
//! deterministic symbol hash ([`ShardRouter`]), the engine merges worker
//! buffers shard-by-shard behind its barrier ([`ShardRouter::absorb`]), and
//! each fold worker groups its own shard by symbol ([`group_by_symbol`]).
//! A distributed execution engine could replace the mechanism wholesale;
//! the tests below pin down the contract, not the mechanism.

use std::collections::BTreeMap;

use crate::record::{CapitalizationSample, SymbolSamples};

/// Per-shard sample buffers. Each transform worker fills a local router;
/// the engine absorbs them all into one before the fold phase starts.
pub struct ShardRouter {
    shards: Vec<Vec<CapitalizationSample>>,
}

impl ShardRouter {
    pub fn new(shards: usize) -> ShardRouter {
        assert!(shards > 0, "a router needs at least one shard");
        ShardRouter {
            shards: vec![Vec::new(); shards],
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Routes samples into their shards. `assign` must be deterministic and
    /// identical across all workers, otherwise one symbol's samples could be
    /// split over two fold invocations.
    pub fn route<F>(&mut self, samples: Vec<CapitalizationSample>, assign: F)
    where
        F: Fn(&str) -> usize,
    {
        let n = self.shards.len();
        for sample in samples {
            let shard = assign(&sample.symbol);
            debug_assert!(shard < n, "shard assignment out of range");
            self.shards[shard % n].push(sample);
        }
    }

    /// Merges another worker's buffers into this one, shard by shard. Order
    /// within a shard is unspecified after the merge; the contract never
    /// promised one.
    pub fn absorb(&mut self, other: ShardRouter) {
        assert_eq!(
            self.shards.len(),
            other.shards.len(),
            "workers disagree on shard count"
        );
        for (ours, theirs) in self.shards.iter_mut().zip(other.shards) {
            ours.extend(theirs);
        }
    }

    pub fn into_shards(self) -> Vec<Vec<CapitalizationSample>> {
        self.shards
    }
}

/// Collects one shard's samples into per-symbol groups, each carrying the
/// symbol's complete value sequence. Groups come out in symbol order so
/// shard output files are deterministic.
pub fn group_by_symbol(samples: Vec<CapitalizationSample>) -> Vec<SymbolSamples> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.symbol)
            .or_default()
            .push(sample.capitalization);
    }
    groups
        .into_iter()
        .map(|(symbol, values)| SymbolSamples::new(symbol, values))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::shard_for_symbol;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn sample(symbol: &str, capitalization: f64) -> CapitalizationSample {
        CapitalizationSample {
            symbol: String::from(symbol),
            capitalization,
        }
    }

    // Flattens grouped output into symbol -> sorted values for comparison.
    fn grouped_map(groups: Vec<SymbolSamples>) -> BTreeMap<String, Vec<u64>> {
        let mut map = BTreeMap::new();
        for group in groups {
            let symbol = group.symbol().to_owned();
            let mut values: Vec<u64> = group.into_iter().map(|v| v.to_bits()).collect();
            values.sort_unstable();
            assert!(
                map.insert(symbol, values).is_none(),
                "a symbol appeared in more than one group"
            );
        }
        map
    }

    #[test]
    fn every_symbol_lands_in_exactly_one_shard() {
        let samples = vec![
            sample("AAPL", 1000.0),
            sample("GOOG", 1000.0),
            sample("AAPL", 4500.0),
            sample("IBM", 7.0),
            sample("AAPL", 2.0),
        ];
        let mut router = ShardRouter::new(3);
        router.route(samples, |symbol| shard_for_symbol(3, symbol));

        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        for (shard_id, shard) in router.into_shards().into_iter().enumerate() {
            for s in shard {
                if let Some(previous) = seen.insert(s.symbol.clone(), shard_id) {
                    assert_eq!(previous, shard_id, "symbol {} split across shards", s.symbol);
                }
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn group_by_symbol_collects_complete_sequences() {
        let groups = group_by_symbol(vec![
            sample("AAPL", 1000.0),
            sample("GOOG", 1000.0),
            sample("AAPL", 4500.0),
        ]);
        assert_eq!(groups.len(), 2);
        // symbol order
        assert_eq!(groups[0].symbol(), "AAPL");
        assert_eq!(groups[1].symbol(), "GOOG");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn group_by_symbol_of_nothing_is_empty() {
        assert!(group_by_symbol(Vec::new()).is_empty());
    }

    #[test]
    fn absorb_requires_matching_shard_counts() {
        let mut a = ShardRouter::new(2);
        let b = ShardRouter::new(2);
        a.absorb(b);
        assert_eq!(a.shard_count(), 2);
    }

    proptest! {
        // The contract: however samples are split across transform workers,
        // after the merge every symbol has exactly one complete group. A
        // single-worker run is the reference.
        #[test]
        fn worker_assignment_is_invisible_after_the_merge(
            samples in proptest::collection::vec(
                ("[A-Z]{1,4}", 0.0f64..1e12).prop_map(|(sym, cap)| CapitalizationSample {
                    symbol: sym,
                    capitalization: cap,
                }),
                0..64,
            ),
            workers in 1usize..5,
            shards in 1usize..5,
        ) {
            let mut reference = ShardRouter::new(shards);
            reference.route(samples.clone(), |s| shard_for_symbol(shards, s));

            let mut merged = ShardRouter::new(shards);
            for chunk in samples.chunks(samples.len().max(1).div_ceil(workers)) {
                let mut local = ShardRouter::new(shards);
                local.route(chunk.to_vec(), |s| shard_for_symbol(shards, s));
                merged.absorb(local);
            }

            let reference_groups: Vec<SymbolSamples> = reference
                .into_shards()
                .into_iter()
                .flat_map(group_by_symbol)
                .collect();
            let merged_groups: Vec<SymbolSamples> = merged
                .into_shards()
                .into_iter()
                .flat_map(group_by_symbol)
                .collect();

            prop_assert_eq!(grouped_map(reference_groups), grouped_map(merged_groups));
        }
    }
}

//! Computes, for every stock symbol in a historical daily-price dataset,
//! the highest market capitalization (closing price times traded volume)
//! ever observed, using a map/fold pipeline bounded to one machine.
//!
//! The pipeline has three parts: a pure per-record transform deriving
//! (symbol, capitalization) samples, a grouping step collecting each
//! symbol's samples from all parallel workers behind a barrier, and a fold
//! reducing one symbol's unordered sequence to its maximum. Everything else
//! (parsing, sharding, worker pools, output files) is orchestration around
//! that contract.

pub mod config;
pub mod currency;
pub mod engine;
pub mod group;
pub mod input;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod record;

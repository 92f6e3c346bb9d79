//! The market-capitalization job: the per-record transform and the
//! maximum fold, wired into a [`ClosurePipeline`].

use crate::currency::{format_currency, Locale};
use crate::pipeline::ClosurePipeline;
use crate::record::{OutputEmitter, PriceRecord, SampleEmitter, SymbolSamples};

/// Name of the distinct-symbol counter reported at job completion.
pub const STOCK_SYMBOLS_COUNTER: &str = "STOCK_SYMBOLS";

/// Emits one (symbol, close * volume) sample per price record.
///
/// Pure: no state is retained between invocations and the result does not
/// depend on which input partition the record came from. Non-negative inputs
/// are a precondition enforced by the parser, not re-validated here.
pub fn capitalization_transform(em: &mut SampleEmitter, record: &PriceRecord) {
    debug_assert!(
        record.close >= 0.0 && record.volume >= 0.0,
        "negative field reached the transform; the parser must reject such records"
    );
    em.emit(record.symbol.clone(), record.close * record.volume);
}

/// Folds one symbol's complete capitalization sequence into its maximum.
///
/// Runs as a per-symbol state machine: the running maximum starts at the
/// `0.0` baseline, each incoming sample raises it via `max`, and once the
/// sequence is exhausted exactly one formatted record is emitted and the
/// distinct-symbol counter is bumped by exactly one, no matter how many
/// samples the symbol produced. `max` is commutative and associative, so the
/// result is independent of sample arrival order. Formatting happens only
/// here, at emission; accumulation stays in raw numeric space.
pub fn maximum_fold(em: &mut OutputEmitter, group: SymbolSamples, locale: Locale) -> u64 {
    let symbol = group.symbol().to_owned();

    let mut running_max = 0.0f64;
    for capitalization in group {
        running_max = running_max.max(capitalization);
    }

    em.emit(symbol, format_currency(running_max, locale));
    1
}

/// The full pipeline: transform, fold, and the default symbol sharder.
pub fn market_cap_pipeline() -> ClosurePipeline {
    ClosurePipeline::new(capitalization_transform, maximum_fold)
}

//! Record types flowing through the pipeline, and the emitters used to
//! yield results from the transform and fold stages.

/// One parsed daily price record. Produced by the input layer; the core
/// consumes it read-only.
///
/// Precondition: `close` and `volume` are non-negative. The parser enforces
/// this before a record ever reaches the transform.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceRecord {
    pub symbol: String,
    pub close: f64,
    pub volume: f64,
}

/// A (symbol, capitalization) pair emitted by the transform. Exists only in
/// transit between the transform and the fold; never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CapitalizationSample {
    pub symbol: String,
    pub capitalization: f64,
}

/// One symbol's complete, unordered capitalization sequence, as delivered by
/// the grouping step to a single fold invocation. Can be iterated over, e.g.
/// in a `for` loop.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolSamples {
    symbol: String,
    values: Vec<f64>,
}

impl SymbolSamples {
    pub fn new(symbol: String, values: Vec<f64>) -> SymbolSamples {
        SymbolSamples { symbol, values }
    }

    /// The symbol all contained values belong to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IntoIterator for SymbolSamples {
    type Item = f64;
    type IntoIter = std::vec::IntoIter<f64>;
    /// Iterates over the capitalization values. No order is guaranteed.
    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Emitter handed to the transform; used to emit (symbol, capitalization)
/// pairs.
#[derive(Default)]
pub struct SampleEmitter {
    samples: Vec<CapitalizationSample>,
}

impl SampleEmitter {
    pub fn new() -> SampleEmitter {
        SampleEmitter::default()
    }

    pub fn emit(&mut self, symbol: String, capitalization: f64) {
        self.samples.push(CapitalizationSample {
            symbol,
            capitalization,
        });
    }

    pub fn into_samples(self) -> Vec<CapitalizationSample> {
        self.samples
    }
}

/// One output line: a symbol and its formatted maximum capitalization.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRecord {
    pub symbol: String,
    pub formatted: String,
}

/// Emitter handed to the fold; used to emit final per-symbol records.
#[derive(Default)]
pub struct OutputEmitter {
    records: Vec<OutputRecord>,
}

impl OutputEmitter {
    pub fn new() -> OutputEmitter {
        OutputEmitter::default()
    }

    pub fn emit(&mut self, symbol: String, formatted: String) {
        self.records.push(OutputRecord { symbol, formatted });
    }

    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }
}

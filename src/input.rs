//! The parsing collaborator: reads hackreduce NASDAQ/NYSE daily-price CSV
//! files into [`PriceRecord`]s.
//!
//! Each file carries a header line
//! (`exchange,stock_symbol,date,stock_price_open,...`); only the symbol,
//! closing price, and volume columns are used. The input location may be a
//! single file or a directory, in which case every regular file in it is
//! read (dotfiles skipped), in name order.
//!
//! This layer owns the non-negativity precondition of the core: malformed
//! numerics, negative fields, and empty symbols are rejected loudly with the
//! offending file and line named, so data corruption cannot masquerade as a
//! legitimate `$0.00` result downstream.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::record::PriceRecord;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read input location {}: {source}", .path.display())]
    Location {
        path: PathBuf,
        source: io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("{}:{line}: {field} is negative ({value})", .path.display())]
    NegativeField {
        path: PathBuf,
        line: u64,
        field: &'static str,
        value: f64,
    },
    #[error("{}:{line}: {field} is not a finite number", .path.display())]
    NonFiniteField {
        path: PathBuf,
        line: u64,
        field: &'static str,
    },
    #[error("{}:{line}: empty stock symbol", .path.display())]
    EmptySymbol { path: PathBuf, line: u64 },
}

/// One raw dataset row; columns other than these three are ignored.
#[derive(Debug, Deserialize)]
struct RawDailyRow {
    stock_symbol: String,
    stock_price_close: f64,
    stock_volume: f64,
}

fn validate(raw: RawDailyRow, path: &Path, line: u64) -> Result<PriceRecord, ParseError> {
    if raw.stock_symbol.is_empty() {
        return Err(ParseError::EmptySymbol {
            path: path.to_path_buf(),
            line,
        });
    }
    for (field, value) in [
        ("stock_price_close", raw.stock_price_close),
        ("stock_volume", raw.stock_volume),
    ] {
        if !value.is_finite() {
            return Err(ParseError::NonFiniteField {
                path: path.to_path_buf(),
                line,
                field,
            });
        }
        if value < 0.0 {
            return Err(ParseError::NegativeField {
                path: path.to_path_buf(),
                line,
                field,
                value,
            });
        }
    }
    Ok(PriceRecord {
        symbol: raw.stock_symbol,
        close: raw.stock_price_close,
        volume: raw.stock_volume,
    })
}

struct FileRows {
    path: PathBuf,
    rows: csv::DeserializeRecordsIntoIter<fs::File, RawDailyRow>,
    line: u64,
}

/// Iterator over all price records at an input location. Yields records in
/// file order, but consumers must not rely on any order; the pipeline
/// doesn't.
pub struct PriceRecordReader {
    // reversed, so pop() walks files in name order
    pending: Vec<PathBuf>,
    current: Option<FileRows>,
}

/// Opens a file or directory of daily-price CSVs for reading.
pub fn open(location: &Path) -> Result<PriceRecordReader, ParseError> {
    let mut pending = Vec::new();
    if location.is_dir() {
        let dir = fs::read_dir(location).map_err(|source| ParseError::Location {
            path: location.to_path_buf(),
            source,
        })?;
        for entry in dir {
            let entry = entry.map_err(|source| ParseError::Location {
                path: location.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            if path.is_file() && !hidden {
                pending.push(path);
            }
        }
        pending.sort();
        pending.reverse();
    } else {
        pending.push(location.to_path_buf());
    }
    Ok(PriceRecordReader {
        pending,
        current: None,
    })
}

impl Iterator for PriceRecordReader {
    type Item = Result<PriceRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = &mut self.current {
                file.line += 1;
                match file.rows.next() {
                    Some(Ok(raw)) => return Some(validate(raw, &file.path, file.line)),
                    Some(Err(source)) => {
                        let path = file.path.clone();
                        self.current = None;
                        return Some(Err(ParseError::Csv { path, source }));
                    }
                    None => self.current = None,
                }
            }

            let path = self.pending.pop()?;
            match csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(&path)
            {
                Ok(reader) => {
                    self.current = Some(FileRows {
                        path,
                        rows: reader.into_deserialize(),
                        // header occupies line 1
                        line: 1,
                    });
                }
                Err(source) => return Some(Err(ParseError::Csv { path, source })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "exchange,stock_symbol,date,stock_price_open,stock_price_high,\
                          stock_price_low,stock_price_close,stock_volume,stock_price_adj_close";

    fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "{}", HEADER).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    fn read_all(location: &Path) -> Result<Vec<PriceRecord>, ParseError> {
        open(location).unwrap().collect()
    }

    #[test]
    fn parses_data_rows_and_skips_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "NASDAQ_daily_prices_A.csv",
            &[
                "NASDAQ,AAPL,2009-12-09,196.23,201.44,195.21,197.80,21517900,197.80",
                "NASDAQ,AACC,2009-12-09,6.10,6.24,6.04,6.11,81800,6.11",
            ],
        );

        let records = read_all(&file).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "AAPL");
        assert_eq!(records[0].close, 197.80);
        assert_eq!(records[0].volume, 21517900.0);
        assert_eq!(records[1].symbol, "AACC");
    }

    #[test]
    fn reads_every_file_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "b.csv",
            &["NYSE,IBM,2009-12-09,126.0,128.0,125.0,127.0,100,127.0"],
        );
        write_file(
            dir.path(),
            "a.csv",
            &["NASDAQ,AAPL,2009-12-09,196.0,201.0,195.0,197.0,200,197.0"],
        );
        fs::write(dir.path().join(".hidden"), "not,a,csv").unwrap();

        let records = read_all(dir.path()).unwrap();
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        // name order: a.csv before b.csv
        assert_eq!(symbols, vec!["AAPL", "IBM"]);
    }

    #[test]
    fn rejects_negative_close() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "bad.csv",
            &["NYSE,IBM,2009-12-09,126.0,128.0,125.0,-127.0,100,127.0"],
        );

        let err = read_all(&file).unwrap_err();
        match err {
            ParseError::NegativeField { line, field, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(field, "stock_price_close");
                assert_eq!(value, -127.0);
            }
            other => panic!("expected NegativeField, got {other}"),
        }
    }

    #[test]
    fn rejects_negative_volume() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "bad.csv",
            &["NYSE,IBM,2009-12-09,126.0,128.0,125.0,127.0,-100,127.0"],
        );

        assert!(matches!(
            read_all(&file).unwrap_err(),
            ParseError::NegativeField {
                field: "stock_volume",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "bad.csv",
            &["NYSE,IBM,2009-12-09,126.0,128.0,125.0,not-a-number,100,127.0"],
        );

        assert!(matches!(read_all(&file).unwrap_err(), ParseError::Csv { .. }));
    }

    #[test]
    fn rejects_empty_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "bad.csv",
            &["NYSE,,2009-12-09,126.0,128.0,125.0,127.0,100,127.0"],
        );

        assert!(matches!(
            read_all(&file).unwrap_err(),
            ParseError::EmptySymbol { line: 2, .. }
        ));
    }

    #[test]
    fn missing_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        let result: Result<Vec<_>, _> = open(&missing).unwrap().collect();
        assert!(matches!(result.unwrap_err(), ParseError::Csv { .. }));
    }
}

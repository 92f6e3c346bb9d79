//! Output-side I/O: preparing the output directory and writing per-shard
//! `part-*` files of `<symbol>\t<formatted>` lines.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::OutputRecord;

/// Name of one shard's output file, e.g. `part-00002`.
pub fn shard_file_name(shard: usize) -> String {
    format!("part-{:05}", shard)
}

/// Destructively prepares the output location: if it already exists it is
/// deleted recursively, then recreated empty. Running a job twice against
/// the same location therefore overwrites rather than failing or appending.
pub fn prepare_output_dir(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)
}

/// Writes one fold shard's output records as tab-separated lines.
pub struct ShardWriter {
    w: BufWriter<fs::File>,
}

impl ShardWriter {
    pub fn create(dir: &Path, shard: usize) -> io::Result<ShardWriter> {
        let file = fs::File::create(dir.join(shard_file_name(shard)))?;
        Ok(ShardWriter {
            w: BufWriter::new(file),
        })
    }

    pub fn write_record(&mut self, record: &OutputRecord) -> io::Result<()> {
        writeln!(self.w, "{}\t{}", record.symbol, record.formatted)
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.w.flush()
    }
}

/// Reads back every output line across all shards, sorted by symbol, for
/// inspecting a finished run's output as one list.
pub fn read_output_lines(dir: &Path) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut shard_files: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("part-"))
                .unwrap_or(false)
        })
        .collect();
    shard_files.sort();
    for path in shard_files {
        for line in fs::read_to_string(path)?.lines() {
            lines.push(line.to_owned());
        }
    }
    lines.sort();
    Ok(lines)
}

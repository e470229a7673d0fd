use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_LINES: usize = 10;

/// Read the last `n` lines of a file without holding the whole file.
pub fn tail_file(path: &Path, n: usize) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
    line_reader::last_n_from_reader(BufReader::new(file), n)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Parse a `--lines` value: a positive integer.
pub fn parse_line_count(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => anyhow::bail!("invalid line count: {raw}"),
    }
}

//! Line-oriented input from stdin or a file.
//!
//! The `*_from_reader` functions hold the actual logic and accept any
//! [`BufRead`]; the stdin wrappers lock stdin and delegate to them.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::Path;

/// Whether stdin is piped/redirected rather than an interactive terminal.
pub fn has_piped_input() -> bool {
    !io::stdin().is_terminal()
}

fn strip_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Invalid UTF-8 is replaced rather than rejected.
fn next_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    strip_line_ending(&mut buf);
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read every line from `reader`.
pub fn lines_from_reader<R: BufRead>(mut reader: R) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Some(line) = next_line(&mut reader)? {
        lines.push(line);
    }
    Ok(lines)
}

/// Read at most `n` lines; stops reading once `n` lines are collected.
pub fn first_n_from_reader<R: BufRead>(mut reader: R, n: usize) -> io::Result<Vec<String>> {
    let mut lines = Vec::with_capacity(n.min(1024));
    while lines.len() < n {
        match next_line(&mut reader)? {
            Some(line) => lines.push(line),
            None => break,
        }
    }
    Ok(lines)
}

/// Keep only the last `n` lines, evicting the oldest as new ones arrive.
pub fn last_n_from_reader<R: BufRead>(mut reader: R, n: usize) -> io::Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut buffer = VecDeque::with_capacity(n.min(1024));
    while let Some(line) = next_line(&mut reader)? {
        buffer.push_back(line);
        if buffer.len() > n {
            buffer.pop_front();
        }
    }
    Ok(buffer.into())
}

/// All of stdin as one string, lines joined by `\n`, no trailing newline.
pub fn read_all() -> io::Result<String> {
    Ok(read_lines()?.join("\n"))
}

pub fn read_lines() -> io::Result<Vec<String>> {
    lines_from_reader(io::stdin().lock())
}

pub fn read_first_n_lines(n: usize) -> io::Result<Vec<String>> {
    first_n_from_reader(io::stdin().lock(), n)
}

pub fn read_last_n_lines(n: usize) -> io::Result<Vec<String>> {
    last_n_from_reader(io::stdin().lock(), n)
}

/// Read lines from `source`: `"-"` or an empty string selects stdin,
/// anything else is a file path.
pub fn read_lines_from(source: &str) -> Result<Vec<String>> {
    if source.is_empty() || source == "-" {
        tracing::debug!("reading lines from stdin");
        return read_lines().context("failed to read stdin");
    }

    let path = Path::new(source);
    tracing::debug!(path = %path.display(), "reading lines from file");
    let file = File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;
    lines_from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read file: {}", path.display()))
}

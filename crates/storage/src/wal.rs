// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage

use dm_core::Operation;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    ///
    /// A torn tail left by a crash mid-append is truncated away so later
    /// appends start on a clean line.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let scan = scan(path)?;
        if let Some(valid_len) = scan.torn_at {
            file.set_len(valid_len)?;
        } else if scan.missing_newline {
            writeln!(file)?;
        }
        let sequence = scan.entries.last().map(|entry| entry.seq).unwrap_or(0);

        Ok(Self { file, sequence })
    }

    /// Append an operation to the log
    pub fn append(&mut self, op: &Operation) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_all()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log
    ///
    /// A torn final line (crash mid-append) is skipped; corruption anywhere
    /// else is an error.
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        Ok(scan(path)?.entries.into_iter().map(|e| e.op).collect())
    }
}

struct Scan {
    entries: Vec<WalEntry>,
    /// Byte length of the valid prefix when the final line is torn
    torn_at: Option<u64>,
    missing_newline: bool,
}

fn scan(path: &Path) -> Result<Scan, WalError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<&str> = contents.split_inclusive('\n').collect();
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let mut entries = Vec::new();
    let mut torn_at = None;
    let mut offset = 0u64;

    for (idx, line) in lines.iter().enumerate() {
        let start = offset;
        offset += line.len() as u64;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WalEntry>(line.trim_end()) {
            Ok(entry) => entries.push(entry),
            Err(e) if Some(idx) == last => {
                tracing::warn!(line = idx + 1, error = %e, "skipping torn WAL entry");
                torn_at = Some(start);
            }
            Err(source) => {
                return Err(WalError::Corrupt {
                    line: idx + 1,
                    source,
                })
            }
        }
    }

    Ok(Scan {
        entries,
        torn_at,
        missing_newline: torn_at.is_none() && !contents.is_empty() && !contents.ends_with('\n'),
    })
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    op: Operation,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;

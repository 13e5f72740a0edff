// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for table mutations
//!
//! One JSON entry per line. Each entry carries a sequence number, a UTC
//! timestamp and a CRC32 of its serialized operation. On open, anything
//! after the last intact entry is cut off so later appends stay readable.

use crate::table::{ConnectionRow, IndexDescription};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row change inside a committed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowWrite {
    Put { row: ConnectionRow },
    Delete { name: String },
}

/// A durable table mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableOp {
    CreateTable,
    DropTable,
    AddIndex { index: IndexDescription },
    DropIndex { name: String },
    /// All writes of one transaction, applied together
    Commit { writes: Vec<RowWrite> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub op: TableOp,
    /// CRC32 of the serialized operation
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(sequence: u64, op: TableOp) -> Result<Self, WalError> {
        let checksum = checksum(&op)?;
        Ok(Self {
            sequence,
            timestamp: Utc::now(),
            op,
            checksum,
        })
    }

    pub fn verify(&self) -> bool {
        checksum(&self.op).is_ok_and(|sum| sum == self.checksum)
    }
}

fn checksum(op: &TableOp) -> Result<u32, WalError> {
    let json = serde_json::to_string(op)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

/// Append-only log file
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: File,
    next_sequence: u64,
}

/// Result of scanning a log file
struct Scan {
    entries: Vec<WalEntry>,
    /// Byte length of the intact prefix
    valid_len: u64,
    /// Lines after the intact prefix
    skipped: usize,
}

impl Wal {
    /// Open or create the log, returning it with every intact operation
    pub fn open(path: &Path) -> Result<(Self, Vec<TableOp>), WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let scan = if path.exists() {
            scan(path)?
        } else {
            Scan {
                entries: Vec::new(),
                valid_len: 0,
                skipped: 0,
            }
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if scan.skipped > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped = scan.skipped,
                "discarding corrupt write-ahead log tail"
            );
            file.set_len(scan.valid_len)?;
        }

        let next_sequence = scan.entries.last().map_or(0, |e| e.sequence + 1);
        let ops = scan.entries.into_iter().map(|e| e.op).collect();
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                next_sequence,
            },
            ops,
        ))
    }

    /// Durably append an operation, returning its sequence number
    pub fn append(&mut self, op: TableOp) -> Result<u64, WalError> {
        let sequence = self.next_sequence;
        let entry = WalEntry::new(sequence, op)?;
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Next sequence number to be assigned
    pub fn sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn scan(path: &Path) -> Result<Scan, WalError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut valid_len = 0u64;
    let mut skipped = 0usize;
    let mut intact = true;
    let mut buf = String::new();

    loop {
        buf.clear();
        let read = match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => {
                skipped += 1;
                break;
            }
        };
        if !intact {
            skipped += 1;
            continue;
        }
        let line = buf.trim_end_matches('\n');
        if line.is_empty() {
            valid_len += read as u64;
            continue;
        }
        // a line without its newline is a torn write
        let complete = buf.ends_with('\n');
        match serde_json::from_str::<WalEntry>(line) {
            Ok(entry) if complete && entry.verify() => {
                valid_len += read as u64;
                entries.push(entry);
            }
            _ => {
                intact = false;
                skipped += 1;
            }
        }
    }

    Ok(Scan {
        entries,
        valid_len,
        skipped,
    })
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trawl-storage: transactional tables and the job store
//!
//! - [`ConnectionTable`]: the store interface connection registries run on
//! - [`MemoryTable`]: row-locking in-memory table, optionally durable
//!   through a checksummed write-ahead log
//! - [`MemoryJobStore`]: document lifecycle states with atomic
//!   fetch-and-mark

mod image;
mod jobs;
mod memory;
mod table;
mod wal;

pub use image::TableImage;
pub use jobs::{DocumentState, MemoryJobStore};
pub use memory::MemoryTable;
pub use table::{columns, ConnectionRow, ConnectionTable, IndexDescription, StoreError, TableTransaction};
pub use wal::{RowWrite, TableOp, Wal, WalEntry, WalError};

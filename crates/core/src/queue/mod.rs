// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, rating-ordered queues of document batches
//!
//! Stuffer threads push [`DocumentBatch`](crate::DocumentBatch)es; workers
//! pull the best-rated batch under a [`RatingContext`].

mod document_queue;
mod rating;

pub use document_queue::{DocumentQueue, RatingContext};
pub use rating::BinTracker;

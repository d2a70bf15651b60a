// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-consumer aggregation of captured lines into delivery batches.
//!
//! The aggregator is the only place timestamps are assigned: stamping at
//! dequeue time on one thread is what guarantees entries within a batch are
//! non-decreasing, which the intake requires. Sentinels are counted here so
//! the pipeline can tell when every reader has drained.

use crate::envelope::{StreamItem, TimestampedEntry};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Accumulates timestamped entries between flushes and tracks reader
/// completion. Owned exclusively by the pipeline loop; no locking needed.
pub struct LogAggregator {
    pending: Vec<TimestampedEntry>,
    reader_count: usize,
    drained_readers: usize,
    last_timestamp: i64,
}

impl LogAggregator {
    pub fn new(reader_count: usize) -> Self {
        Self {
            pending: Vec::new(),
            reader_count,
            drained_readers: 0,
            last_timestamp: 0,
        }
    }

    /// Consume one channel item: stamp and buffer an envelope, or count a
    /// sentinel against the known reader count.
    pub fn observe(&mut self, item: StreamItem) {
        match item {
            StreamItem::Line(envelope) => {
                // Clamp against the previous stamp so a wall-clock step
                // backwards cannot break batch ordering.
                let timestamp = now_millis().max(self.last_timestamp);
                self.last_timestamp = timestamp;
                self.pending.push(TimestampedEntry {
                    timestamp,
                    message: envelope.into_message(),
                });
            }
            StreamItem::Eof => {
                self.drained_readers += 1;
                debug!(
                    drained = self.drained_readers,
                    readers = self.reader_count,
                    "Reader drained"
                );
            }
        }
    }

    /// True once every reader has produced its sentinel.
    pub fn all_sources_drained(&self) -> bool {
        self.drained_readers >= self.reader_count
    }

    pub fn drained_readers(&self) -> usize {
        self.drained_readers
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Move the whole pending batch out, leaving an empty one accumulating.
    pub fn take_batch(&mut self) -> Vec<TimestampedEntry> {
        std::mem::take(&mut self.pending)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Time-based flush rule: flush when the pending batch is non-empty and the
/// send interval has elapsed since the last flush. This is the only flush
/// trigger; batch size is unbounded within the interval window.
pub struct FlushPolicy {
    interval: Duration,
    last_flush: Instant,
}

impl FlushPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_flush: Instant::now(),
        }
    }

    pub fn should_flush(&self, pending_nonempty: bool) -> bool {
        pending_nonempty && self.last_flush.elapsed() > self.interval
    }

    pub fn mark_flushed(&mut self) {
        self.last_flush = Instant::now();
    }

    /// Instant at which the current interval window closes.
    pub fn next_deadline(&self) -> Instant {
        self.last_flush + self.interval
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Data model for captured log lines.
//!
//! A [`LogEnvelope`] is one line of workload output plus its source and
//! command metadata, created by a line reader. The aggregator turns each
//! envelope into a [`TimestampedEntry`] at the moment it dequeues it, so
//! that entry timestamps within a batch are assigned on a single thread
//! and stay non-decreasing.

use serde::Serialize;

/// Which output channel of the workload a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// One captured log line, pre-timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEnvelope {
    pub command: String,
    pub source: StreamSource,
    /// One line of output, trailing newline stripped.
    pub data: String,
}

impl LogEnvelope {
    pub fn new(source: StreamSource, command: &str, data: String) -> Self {
        Self {
            command: command.to_string(),
            source,
            data,
        }
    }

    /// Serialize the envelope into the delivery message string.
    pub fn into_message(self) -> String {
        // Serialization of these three string fields cannot fail; fall back
        // to the raw line if it somehow does.
        serde_json::to_string(&self).unwrap_or(self.data)
    }
}

/// Item carried on the ordering channel: a real envelope or the
/// end-of-stream sentinel. A tagged variant rather than a reserved value,
/// so no log line can collide with the sentinel encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Line(LogEnvelope),
    Eof,
}

/// A delivery-ready entry: milliseconds since epoch plus the serialized
/// envelope. Within a batch, timestamps are non-decreasing in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampedEntry {
    pub timestamp: i64,
    pub message: String,
}

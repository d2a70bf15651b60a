// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Line readers for the workload's output streams.
//!
//! One reader task runs per stream. Each line becomes a [`StreamItem::Line`]
//! on the ordering channel; end-of-stream produces exactly one
//! [`StreamItem::Eof`]. A read error on the underlying stream is treated as
//! end-of-stream for that reader and never escalated.

use crate::envelope::{LogEnvelope, StreamItem, StreamSource};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn a reader task over `stream`, producing one envelope per line and a
/// single sentinel when the stream is exhausted.
///
/// The task never blocks the other reader or the aggregator; it only
/// enqueues. If the aggregator side of the channel is gone the task stops
/// quietly, since nothing can consume what it would produce.
pub fn spawn_line_reader<R>(
    stream: R,
    source: StreamSource,
    command: String,
    tx: UnboundedSender<StreamItem>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();
        let mut line_count = 0u64;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    line_count += 1;
                    let envelope = LogEnvelope::new(source, &command, line);
                    if tx.send(StreamItem::Line(envelope)).is_err() {
                        debug!(%source, "Ordering channel closed, stopping reader");
                        return;
                    }
                }
                Ok(None) => {
                    debug!(%source, lines = line_count, "Stream ended");
                    break;
                }
                Err(e) => {
                    // Recovered locally: a broken stream means no more lines
                    // will arrive, which is indistinguishable from EOF here.
                    debug!(%source, error = %e, "Read error, treating as end of stream");
                    break;
                }
            }
        }

        let _ = tx.send(StreamItem::Eof);
    })
}

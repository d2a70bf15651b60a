// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline controller: owns the capture-and-delivery lifecycle.
//!
//! The controller launches one reader per output stream, then drives a
//! single select loop over {channel item, workload exit, flush deadline,
//! cancellation}. The loop keeps running while the workload is alive OR a
//! reader has not drained OR the pending batch is non-empty, so buffered
//! data is always delivered before the pipeline declares itself done.

use crate::aggregator::{FlushPolicy, LogAggregator};
use crate::envelope::{StreamItem, StreamSource};
use crate::error::Error;
use crate::intake::Sink;
use crate::reader::spawn_line_reader;
use crate::workload::Workload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const READER_COUNT: usize = 2;

/// Lifecycle states of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Workload and readers are being launched.
    Starting,
    /// Capturing while the workload is alive.
    Running,
    /// Workload exited; readers and the pending batch are being drained.
    Draining,
    /// Operator requested a stop; draining continues before exit.
    Interrupted,
    /// All sources drained and the final flush completed.
    Stopped,
}

/// What a completed run delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub entries_delivered: usize,
    pub batches_flushed: usize,
    pub interrupted: bool,
}

/// One loop turn of the select below.
enum LoopEvent {
    Item(Option<StreamItem>),
    WorkloadExited,
    FlushDue,
    Interrupt,
    ForceKill,
}

/// Drives capture from a workload into a sink.
pub struct Pipeline {
    sink: Arc<dyn Sink + Send + Sync>,
    command: String,
    flush_interval: Duration,
}

impl Pipeline {
    pub fn new(sink: Arc<dyn Sink + Send + Sync>, command: String, flush_interval: Duration) -> Self {
        Self {
            sink,
            command,
            flush_interval,
        }
    }

    /// Run the pipeline to completion.
    ///
    /// `shutdown` requests a graceful stop (the workload is asked to
    /// terminate, then captured data is drained and flushed);
    /// `force_shutdown` escalates to a kill while draining continues.
    pub async fn run(
        &self,
        mut workload: Workload,
        shutdown: CancellationToken,
        force_shutdown: CancellationToken,
    ) -> Result<PipelineSummary, Error> {
        let mut state = PipelineState::Starting;
        debug!(?state, "Pipeline starting");

        let stdout = workload
            .take_stdout()
            .ok_or_else(|| Error::WorkloadStart("stdout was not piped".to_string()))?;
        let stderr = workload
            .take_stderr()
            .ok_or_else(|| Error::WorkloadStart("stderr was not piped".to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_line_reader(stdout, StreamSource::Stdout, self.command.clone(), tx.clone());
        spawn_line_reader(stderr, StreamSource::Stderr, self.command.clone(), tx);

        let mut aggregator = LogAggregator::new(READER_COUNT);
        let mut policy = FlushPolicy::new(self.flush_interval);

        let mut entries_delivered = 0usize;
        let mut batches_flushed = 0usize;
        let mut workload_exited = false;
        let mut channel_closed = false;
        let mut interrupted = false;
        let mut kill_sent = false;

        state = PipelineState::Running;
        debug!(?state, "Pipeline running");

        // Liveness invariant: keep looping while the workload runs, or a
        // reader is undrained, or buffered entries await delivery.
        while !workload_exited || !aggregator.all_sources_drained() || !aggregator.is_empty() {
            let drained = workload_exited && aggregator.all_sources_drained();

            // Flush rule, evaluated once per iteration: timed flush during
            // the run, and an immediate final flush once fully drained.
            if policy.should_flush(!aggregator.is_empty()) || (drained && !aggregator.is_empty()) {
                let batch = aggregator.take_batch();
                let sent = self
                    .sink
                    .deliver(&batch)
                    .await
                    .map_err(|source| Error::Delivery {
                        delivered: entries_delivered,
                        source,
                    })?;
                policy.mark_flushed();
                entries_delivered += sent;
                batches_flushed += 1;
                info!("Sent {sent} logs");
                continue;
            }

            let flush_deadline = tokio::time::Instant::from_std(policy.next_deadline());

            let event = tokio::select! {
                item = rx.recv(), if !channel_closed => LoopEvent::Item(item),
                _ = workload.wait(), if !workload_exited => LoopEvent::WorkloadExited,
                _ = tokio::time::sleep_until(flush_deadline), if !aggregator.is_empty() => {
                    LoopEvent::FlushDue
                }
                _ = shutdown.cancelled(), if !interrupted => LoopEvent::Interrupt,
                _ = force_shutdown.cancelled(), if interrupted && !kill_sent => {
                    LoopEvent::ForceKill
                }
            };

            match event {
                LoopEvent::Item(Some(item)) => aggregator.observe(item),
                LoopEvent::Item(None) => channel_closed = true,
                LoopEvent::WorkloadExited => {
                    workload_exited = true;
                    if state != PipelineState::Interrupted {
                        state = PipelineState::Draining;
                    }
                    debug!(?state, "Workload exited, draining readers and batch");
                }
                LoopEvent::FlushDue => {
                    // Wake-up only; the rule at the top of the loop flushes.
                }
                LoopEvent::Interrupt => {
                    interrupted = true;
                    state = PipelineState::Interrupted;
                    info!("Interrupt received, stopping workload");
                    workload.stop();
                }
                LoopEvent::ForceKill => {
                    kill_sent = true;
                    info!("Second interrupt, killing workload");
                    workload.kill();
                }
            }
        }

        state = PipelineState::Stopped;
        debug!(?state, entries_delivered, "Pipeline stopped");

        Ok(PipelineSummary {
            entries_delivered,
            batches_flushed,
            interrupted,
        })
    }
}

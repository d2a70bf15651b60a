// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Container log capture and delivery pipeline.
//!
//! Two stream readers run concurrently over a workload's stdout and stderr,
//! feeding one ordering channel. A single-threaded aggregator stamps each
//! line at dequeue time, accumulates a pending batch, and hands it to the
//! intake client whenever the send interval elapses. The pipeline controller
//! owns startup, liveness tracking, cancellation, and the final
//! drain-and-flush before reporting how many entries were delivered.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod aggregator;
pub mod config;
pub mod envelope;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod reader;
pub mod workload;

pub use config::Config;
pub use error::{DeliveryError, Error};
pub use pipeline::{Pipeline, PipelineState, PipelineSummary};

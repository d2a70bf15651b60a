// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! Client for the remote log intake.
//!
//! Covers both collaborator roles at the sink boundary: idempotent
//! provisioning of the destination group/stream, and ordered batch
//! delivery. Entries in a submission must be non-decreasing in timestamp,
//! which the aggregator guarantees by construction.

use crate::config::Config;
use crate::envelope::TimestampedEntry;
use crate::error::{DeliveryError, Error};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

const LOGS_PATH: &str = "/api/v1/logs";
const GROUPS_PATH: &str = "/api/v1/groups";
const STREAMS_PATH: &str = "/api/v1/streams";

/// Delivery seam between the pipeline and the remote intake.
#[async_trait]
pub trait Sink {
    /// Submit one ordered batch. On success returns the number of entries
    /// the intake accepted. No in-process retry: a failure propagates to
    /// the pipeline controller as fatal for that flush.
    async fn deliver(&self, batch: &[TimestampedEntry]) -> Result<usize, DeliveryError>;
}

#[derive(Serialize)]
struct PutEventsRequest<'a> {
    destination_group: &'a str,
    destination_stream: &'a str,
    entries: &'a [TimestampedEntry],
}

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct CreateStreamRequest<'a> {
    group: &'a str,
    name: &'a str,
}

/// HTTP client for the log intake API.
#[derive(Clone)]
pub struct IntakeClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    group: String,
    stream: String,
}

impl IntakeClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Runtime(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            group: config.group.clone(),
            stream: config.stream.clone(),
        })
    }

    /// Create the destination group if absent. "Already exists" (409) is
    /// success, so calling this twice never errors or duplicates.
    pub async fn ensure_group(&self) -> Result<(), Error> {
        let body = CreateGroupRequest { name: &self.group };
        let created = self
            .provision(GROUPS_PATH, &body)
            .await
            .map_err(|e| Error::Provisioning(e.to_string()))?;
        if created {
            info!(group = %self.group, "Log group created");
        }
        Ok(())
    }

    /// Create the destination stream if absent, tolerating "already exists".
    pub async fn ensure_stream(&self) -> Result<(), Error> {
        let body = CreateStreamRequest {
            group: &self.group,
            name: &self.stream,
        };
        let created = self
            .provision(STREAMS_PATH, &body)
            .await
            .map_err(|e| Error::Provisioning(e.to_string()))?;
        if created {
            info!(group = %self.group, stream = %self.stream, "Log stream created");
        }
        Ok(())
    }

    /// Returns Ok(true) when the resource was created, Ok(false) when it
    /// already existed.
    async fn provision<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<bool, DeliveryError> {
        let response = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == reqwest::StatusCode::CONFLICT {
            debug!(path, "Destination already exists");
            return Ok(false);
        }

        Err(DeliveryError::Status {
            status,
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Sink for IntakeClient {
    async fn deliver(&self, batch: &[TimestampedEntry]) -> Result<usize, DeliveryError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let body = PutEventsRequest {
            destination_group: &self.group,
            destination_stream: &self.stream,
            entries: batch,
        };

        let response = self
            .client
            .post(format!("{}{}", self.endpoint, LOGS_PATH))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(entries = batch.len(), "Batch accepted by intake");
            return Ok(batch.len());
        }

        Err(DeliveryError::Status {
            status,
            body: response.text().await.unwrap_or_default(),
        })
    }
}

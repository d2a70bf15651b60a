// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors that can occur while provisioning, starting, or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to provision log destination: {0}")]
    Provisioning(String),

    #[error("Failed to start workload: {0}")]
    WorkloadStart(String),

    /// A flush failed mid-run. `delivered` counts the entries accepted by
    /// the intake before the failing batch; the failing batch itself is
    /// not counted.
    #[error("Delivery failed after {delivered} entries: {source}")]
    Delivery {
        delivered: usize,
        source: DeliveryError,
    },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// A single batch submission failure, split between transport errors and
/// intake rejections.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request error: {0}")]
    Request(String),

    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::InvalidConfig("missing API key".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: missing API key");
    }

    #[test]
    fn test_delivery_error_carries_partial_count() {
        let error = Error::Delivery {
            delivered: 42,
            source: DeliveryError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "try later".to_string(),
            },
        };
        let msg = error.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_request_error_display() {
        let error = DeliveryError::Request("connection refused".to_string());
        assert_eq!(error.to_string(), "request error: connection refused");
    }
}

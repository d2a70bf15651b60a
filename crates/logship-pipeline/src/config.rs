// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use std::time::Duration;

/// How often the pending batch is handed to the intake, in seconds.
pub const DEFAULT_SEND_INTERVAL_SECS: u64 = 5;

/// Configuration for a log capture pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Docker image the workload runs in.
    pub docker_image: String,
    /// Bash command executed inside the image.
    pub bash_command: String,
    /// Base URL of the log intake (e.g., <https://logs.example.com>).
    pub endpoint: String,
    /// API key sent with every intake request.
    pub api_key: String,
    /// Destination log group name.
    pub group: String,
    /// Destination log stream name.
    pub stream: String,
    /// Seconds between timed flushes of the pending batch.
    pub send_interval_secs: u64,
    /// Timeout applied to each intake request.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker_image: String::new(),
            bash_command: String::new(),
            endpoint: String::new(),
            api_key: String::new(),
            group: String::new(),
            stream: String::new(),
            send_interval_secs: DEFAULT_SEND_INTERVAL_SECS,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if self.docker_image.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "docker image cannot be empty".to_string(),
            ));
        }

        if self.bash_command.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "bash command cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "endpoint '{}' must be an http(s) URL",
                self.endpoint
            )));
        }

        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("API key cannot be empty".to_string()));
        }

        if self.group.trim().is_empty() || self.stream.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "destination group and stream cannot be empty".to_string(),
            ));
        }

        if self.send_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "send interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(self.send_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

//! Registration with bounded retry.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{post_json, registration_uri};
use crate::error::RegisterError;

/// Registration request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRegistrationInfo {
    pub studenttask_url: String,
}

/// Result of a completed registration exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The simulator answered 200.
    Registered,
    /// The simulator answered with any other status.
    Rejected { status: u16 },
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered)
    }
}

/// Exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Delay before the next attempt; doubles each call up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

/// Announces this service to the simulator.
#[derive(Debug, Clone)]
pub struct Registrar {
    simulator_url: String,
    studenttask_url: String,
    timeout: Duration,
    attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Registrar {
    pub fn new(simulator_url: impl Into<String>, studenttask_url: impl Into<String>) -> Self {
        Self {
            simulator_url: simulator_url.into(),
            studenttask_url: studenttask_url.into(),
            timeout: Duration::from_secs(1),
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }

    /// Per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts, including the first. Clamped to at least one.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Register with the simulator.
    ///
    /// Transport failures are retried; any HTTP response ends the loop.
    pub async fn register(&self) -> Result<RegistrationOutcome, RegisterError> {
        let uri = registration_uri(&self.simulator_url)?;
        let body = Bytes::from(serde_json::to_vec(&TaskRegistrationInfo {
            studenttask_url: self.studenttask_url.clone(),
        })?);

        let mut backoff = Backoff::new(self.initial_backoff, self.max_backoff);
        let mut attempt = 1;

        loop {
            debug!(%uri, attempt, "registering with simulator");
            match post_json(&uri, body.clone(), self.timeout).await {
                Ok(status) if status == StatusCode::OK => {
                    info!(
                        simulator = %self.simulator_url,
                        studenttask_url = %self.studenttask_url,
                        "registered with simulator"
                    );
                    return Ok(RegistrationOutcome::Registered);
                }
                Ok(status) => {
                    warn!(
                        simulator = %self.simulator_url,
                        status = status.as_u16(),
                        "simulator rejected registration"
                    );
                    return Ok(RegistrationOutcome::Rejected {
                        status: status.as_u16(),
                    });
                }
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = backoff.next_delay();
                    warn!(
                        attempt,
                        attempts = self.attempts,
                        error = %e,
                        retry_in = ?delay,
                        "registration attempt failed"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

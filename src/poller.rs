//! # Poller
//!
//! Fetches the tracker's current positions on a fixed cadence and hands each
//! starter to the [`Extractor`].
//!
//! ## Cycle
//!
//! 1. GET the endpoint; anything but `200 OK` is a failed attempt
//! 2. Decode the body as JSON and pull out the `starters` array
//! 3. Run every starter through the extractor, counting logged and skipped
//!
//! Failed attempts are retried after a fixed delay, up to the configured
//! budget (10 attempts, 5 s apart by default). Once the budget is spent the
//! cycle is abandoned and the scheduler carries on.
//!
//! ## Schedule
//!
//! Cycle starts are one period apart (90 s by default). Time spent in the
//! cycle, retries included, is subtracted from the following sleep. A cycle
//! that overruns the period is followed immediately by the next one.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::{ApiConfig, ScheduleConfig};
use crate::error::{RacemapLoggerError, Result};
use crate::shutdown::Shutdown;
use crate::telemetry::extractor::Extractor;
use crate::telemetry::sink::LogSink;

/// Source of raw tracker responses
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrackerSource: Send + Sync {
    /// Fetch one response body
    ///
    /// # Errors
    ///
    /// Returns a retryable error on non-200 status, timeout or network failure.
    async fn fetch(&self) -> Result<String>;
}

/// Racemap HTTP API client
#[derive(Debug, Clone)]
pub struct HttpTrackerSource {
    client: Client,
    url: String,
}

impl HttpTrackerSource {
    /// Build a client for the endpoint described by `api`
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(api.connect_timeout())
            .timeout(api.request_timeout())
            .build()
            .map_err(|e| RacemapLoggerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, url: api.url() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TrackerSource for HttpTrackerSource {
    async fn fetch(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching current positions");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RacemapLoggerError::HttpStatus { status: status.as_u16(), body });
        }

        Ok(response.text().await?)
    }
}

/// Decode a response body into its list of starter entries
///
/// # Errors
///
/// - [`RacemapLoggerError::MalformedJson`] if the body is not JSON
/// - [`RacemapLoggerError::UnexpectedShape`] if there is no `starters` array
pub fn decode(body: &str) -> Result<Vec<Value>> {
    let document: Value = serde_json::from_str(body)?;
    match document {
        Value::Object(mut map) => match map.remove("starters") {
            Some(Value::Array(starters)) => Ok(starters),
            Some(other) => Err(RacemapLoggerError::UnexpectedShape(format!(
                "'starters' is not an array: {}",
                other
            ))),
            None => Err(RacemapLoggerError::UnexpectedShape(
                "missing 'starters' field".to_string(),
            )),
        },
        other => Err(RacemapLoggerError::UnexpectedShape(format!(
            "top-level value is not an object: {}",
            other
        ))),
    }
}

/// Time left to sleep before the next cycle should start
pub fn next_delay(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Per-cycle extraction tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub logged: usize,
    pub skipped: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.logged + self.skipped
    }

    /// Every starter in the response made it into its log
    pub fn all_logged(&self) -> bool {
        self.skipped == 0
    }
}

/// How a cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// Data fetched and every starter processed
    Completed(CycleReport),
    /// Retry budget spent, or a non-retryable failure
    Abandoned { attempts: u32, error: RacemapLoggerError },
    /// Shutdown requested mid-cycle
    Cancelled,
}

/// Poll loop driving a [`TrackerSource`] into a [`LogSink`]
pub struct Poller<S, K> {
    source: S,
    sink: K,
    extractor: Extractor,
    period: Duration,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<S: TrackerSource, K: LogSink> Poller<S, K> {
    pub fn new(source: S, sink: K, extractor: Extractor, schedule: &ScheduleConfig) -> Self {
        Self {
            source,
            sink,
            extractor,
            period: schedule.period(),
            max_attempts: schedule.max_attempts.max(1),
            retry_delay: schedule.retry_delay(),
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// One fetch + decode attempt
    pub async fn attempt(&self) -> Result<Vec<Value>> {
        let body = self.source.fetch().await?;
        decode(&body)
    }

    /// Run every starter through the extractor
    pub fn extract_all(&mut self, starters: &[Value]) -> CycleReport {
        let mut report = CycleReport::default();

        for entry in starters {
            match self.extractor.process(entry, &mut self.sink) {
                Ok(identity) => {
                    debug!(starter = %identity, "Logged telemetry");
                    report.logged += 1;
                }
                Err(reason) => {
                    warn!("{}", reason);
                    report.skipped += 1;
                }
            }
        }

        if report.all_logged() {
            info!(logged = report.logged, "Log cycle succeeded");
        } else {
            warn!(
                logged = report.logged,
                skipped = report.skipped,
                "Log cycle incomplete"
            );
        }

        report
    }

    /// Fetch, decode and extract, retrying transient failures
    pub async fn run_cycle(&mut self, shutdown: &mut Shutdown) -> CycleOutcome {
        let mut attempt = 0;

        loop {
            if shutdown.is_triggered() {
                return CycleOutcome::Cancelled;
            }
            attempt += 1;

            let error = match self.attempt().await {
                Ok(starters) => return CycleOutcome::Completed(self.extract_all(&starters)),
                Err(e) => e,
            };

            match &error {
                RacemapLoggerError::MalformedJson(_) => {
                    error!(attempt, max_attempts = self.max_attempts, "{}", error)
                }
                RacemapLoggerError::UnexpectedShape(_) => error!(attempt, "{}", error),
                _ => warn!(attempt, max_attempts = self.max_attempts, "Fetch failed: {}", error),
            }

            if !error.is_retryable() || attempt >= self.max_attempts {
                return CycleOutcome::Abandoned { attempts: attempt, error };
            }

            debug!(delay = ?self.retry_delay, "Retrying fetch");
            if !shutdown.sleep(self.retry_delay).await {
                return CycleOutcome::Cancelled;
            }
        }
    }

    /// Run cycles on the fixed period until shutdown
    ///
    /// Returns the number of cycles started.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> u64 {
        info!(period = ?self.period, max_attempts = self.max_attempts, "Poller started");
        let mut cycles: u64 = 0;

        while !shutdown.is_triggered() {
            let started = Instant::now();
            cycles += 1;

            match self.run_cycle(&mut shutdown).await {
                CycleOutcome::Completed(report) => {
                    debug!(cycle = cycles, total = report.total(), "Cycle completed");
                }
                CycleOutcome::Abandoned { attempts, error } => {
                    error!(cycle = cycles, attempts, "Log cycle failed: {}", error);
                }
                CycleOutcome::Cancelled => break,
            }

            let delay = next_delay(self.period, started.elapsed());
            if delay.is_zero() {
                warn!(cycle = cycles, elapsed = ?started.elapsed(), "Cycle overran period, starting next cycle now");
            }
            if !shutdown.sleep(delay).await {
                break;
            }
        }

        info!(cycles, "Poller stopped");
        cycles
    }
}

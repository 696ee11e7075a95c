//! Long-running operations
//!
//! An [`ArmOperation`] starts in `Submitted`, moves to `Polling` while the
//! service reports progress and ends in `Succeeded`, `Failed` or `Canceled`.
//! Terminal states never change again.
//!
//! Polls for one operation are strictly sequential. The delay before the next
//! poll is the server's `Retry-After` when present, else the caller's
//! interval, else the client default. A cancellation token only stops the
//! client from waiting; nothing is sent to the service.

use super::response::{ArmResponse, Converter};
use crate::arm::blocking;
use crate::arm::error::{ArmError, ArmResult, ServiceError};
use crate::arm::http::RawResponse;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Status reported by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// Anything the service reports that is not a terminal status counts as
    /// in progress (`Accepted`, `Creating`, `Updating`, ...).
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone)]
pub struct PollResponse {
    pub status: OperationStatus,
    pub retry_after: Option<Duration>,
    pub error: Option<ServiceError>,
    pub raw: RawResponse,
}

impl PollResponse {
    pub fn new(status: OperationStatus, raw: RawResponse) -> Self {
        Self {
            status,
            retry_after: raw.retry_after(),
            error: None,
            raw,
        }
    }

    pub fn with_error(mut self, error: Option<ServiceError>) -> Self {
        self.error = error;
        self
    }
}

/// Issues status requests for one in-flight operation.
#[async_trait]
pub trait OperationPoller: Send {
    async fn poll(&mut self) -> ArmResult<PollResponse>;

    /// Response carrying the operation's result, fetched once the operation
    /// has succeeded. `last` is the final poll response.
    async fn final_response(&mut self, last: RawResponse) -> ArmResult<RawResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Submitted,
    Polling,
    Succeeded,
    Failed(ServiceError),
    Canceled,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Canceled)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => f.write_str("Submitted"),
            Self::Polling => f.write_str("Polling"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed(e) => write!(f, "Failed ({})", e.code),
            Self::Canceled => f.write_str("Canceled"),
        }
    }
}

/// Options for waiting on an operation.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    poll_interval: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Used when the service does not suggest a delay
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

pub struct ArmOperation<T> {
    state: OperationState,
    initial: RawResponse,
    poller: Option<Box<dyn OperationPoller>>,
    next_delay: Option<Duration>,
    default_interval: Duration,
    convert: Converter<T>,
    outcome: Option<RawResponse>,
}

impl<T> ArmOperation<T> {
    /// Operation the service finished synchronously.
    pub fn completed(initial: RawResponse, convert: Converter<T>) -> Self {
        Self {
            state: OperationState::Succeeded,
            outcome: Some(initial.clone()),
            initial,
            poller: None,
            next_delay: None,
            default_interval: Duration::ZERO,
            convert,
        }
    }

    /// Operation still running on the service side. No poll has been issued yet.
    pub fn pending(
        initial: RawResponse,
        poller: Box<dyn OperationPoller>,
        default_interval: Duration,
        convert: Converter<T>,
    ) -> Self {
        Self {
            state: OperationState::Submitted,
            next_delay: initial.retry_after(),
            initial,
            poller: Some(poller),
            default_interval,
            convert,
            outcome: None,
        }
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn has_completed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Response to the submitting request.
    pub fn initial_response(&self) -> &RawResponse {
        &self.initial
    }

    /// Issue one status request unless the operation is already terminal.
    pub async fn update_status(&mut self) -> ArmResult<&OperationState> {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }
        let Some(poller) = self.poller.as_mut() else {
            return Ok(&self.state);
        };

        let polled = poller.poll().await?;
        self.next_delay = polled.retry_after;

        let next = match polled.status {
            OperationStatus::InProgress => OperationState::Polling,
            OperationStatus::Succeeded => {
                let last = poller.final_response(polled.raw).await?;
                self.outcome = Some(last);
                OperationState::Succeeded
            }
            OperationStatus::Failed => OperationState::Failed(polled.error.unwrap_or_else(|| {
                ServiceError::new("Failed", "the operation failed without an error payload")
            })),
            OperationStatus::Canceled => OperationState::Canceled,
        };

        if next != self.state {
            tracing::info!("Long-running operation {} -> {}", self.state, next);
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Poll until the operation is terminal and return its final response.
    pub async fn wait_for_response(&mut self, options: WaitOptions) -> ArmResult<ArmResponse<T>> {
        loop {
            if let Some(result) = self.terminal_result() {
                return result;
            }

            // First poll goes out at once unless the service asked for a delay
            let delay = if self.state == OperationState::Submitted {
                self.next_delay
            } else {
                Some(
                    self.next_delay
                        .or(options.poll_interval)
                        .unwrap_or(self.default_interval),
                )
            };

            match &options.cancellation {
                Some(token) => {
                    if token.is_cancelled() {
                        return Err(ArmError::OperationCanceled);
                    }
                    if let Some(delay) = delay {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return Err(ArmError::OperationCanceled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(ArmError::OperationCanceled),
                        polled = self.update_status() => { polled?; }
                    }
                }
                None => {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.update_status().await?;
                }
            }
        }
    }

    /// Poll until terminal and return the converted result.
    pub async fn wait_for_completion(&mut self, options: WaitOptions) -> ArmResult<T> {
        self.wait_for_response(options).await?.into_value()
    }

    pub fn update_status_blocking(&mut self) -> ArmResult<OperationState> {
        blocking::block_on(async { self.update_status().await.cloned() })
    }

    pub fn wait_for_response_blocking(&mut self, options: WaitOptions) -> ArmResult<ArmResponse<T>> {
        blocking::block_on(self.wait_for_response(options))
    }

    pub fn wait_for_completion_blocking(&mut self, options: WaitOptions) -> ArmResult<T> {
        blocking::block_on(self.wait_for_completion(options))
    }

    fn terminal_result(&self) -> Option<ArmResult<ArmResponse<T>>> {
        match &self.state {
            OperationState::Succeeded => {
                let raw = self.outcome.clone().unwrap_or_else(|| self.initial.clone());
                Some(Ok(ArmResponse::new(raw, self.convert.clone())))
            }
            OperationState::Failed(error) => Some(Err(ArmError::OperationFailed {
                error: error.clone(),
            })),
            OperationState::Canceled => Some(Err(ArmError::OperationFailed {
                error: ServiceError::new("Canceled", "the operation was canceled on the service side"),
            })),
            OperationState::Submitted | OperationState::Polling => None,
        }
    }
}

impl<T> fmt::Debug for ArmOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmOperation")
            .field("state", &self.state)
            .field("initial_status", &self.initial.status)
            .field("next_delay", &self.next_delay)
            .finish()
    }
}

//! Cloud dashboard collaborator
//!
//! The read cycle publishes [`Metrics`] and raises [`AlertEvent`]s through the
//! [`Dashboard`] trait. [`blynk::BlynkDashboard`] implements it on top of any
//! [`blynk::HttpTransport`].

pub mod blynk;

use thiserror_no_std::Error;

use crate::alert::AlertEvent;
use crate::reading::Metrics;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("DNS lookup failed")]
    Dns,
    #[error("Connection failed")]
    Connect,
    #[error("I/O error during request")]
    Io,
    #[error("Malformed response")]
    MalformedResponse,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Request does not fit the request buffer")]
    RequestTooLong,
    #[error("Transport error: {0}")]
    Transport(TransportError),
    #[error("Dashboard rejected request with status {0}")]
    Rejected(u16),
}

impl From<TransportError> for DashboardError {
    fn from(e: TransportError) -> Self {
        DashboardError::Transport(e)
    }
}

pub trait Dashboard {
    /// Publish the five per-cycle metrics
    fn publish(&mut self, metrics: &Metrics) -> impl Future<Output = Result<(), DashboardError>>;

    /// Raise a named alert event
    fn log_event(&mut self, event: AlertEvent) -> impl Future<Output = Result<(), DashboardError>>;

    /// Process pending connection events between cycles
    fn service(&mut self) -> impl Future<Output = Result<(), DashboardError>> {
        async { Ok(()) }
    }
}

//! Network bring-up with bounded retry

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::RetryPolicy;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("Network not found")]
    NotFound,
    #[error("Authentication rejected")]
    AuthFailed,
    #[error("No address assigned")]
    NoAddress,
    #[error("Radio driver error")]
    Driver,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Gave up after {attempts} attempts, last error: {last}")]
    GaveUp { attempts: u32, last: LinkError },
}

/// Wireless link that can be brought up on demand
pub trait NetworkLink {
    /// One connection attempt, resolving once the link has an address
    fn connect(&mut self) -> impl Future<Output = Result<(), LinkError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
    GaveUp { attempts: u32 },
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Drives a [`NetworkLink`] to the connected state under a [`RetryPolicy`]
pub struct Connector {
    policy: RetryPolicy,
    state: ConnectionState,
}

impl Connector {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Mark the link as lost so the next [`Connector::establish`] starts over
    pub fn link_lost(&mut self) {
        warn!("Network link lost");
        self.state = ConnectionState::Disconnected;
    }

    pub async fn establish<L, D>(&mut self, link: &mut L, delay: &mut D) -> Result<(), ConnectError>
    where
        L: NetworkLink,
        D: DelayNs,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.state = ConnectionState::Connecting { attempt };
            info!(
                "Connecting to network (attempt {}/{})",
                attempt, self.policy.max_attempts
            );

            match link.connect().await {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    info!("Connected to network");
                    return Ok(());
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    self.state = ConnectionState::GaveUp { attempts: attempt };
                    warn!("Giving up on network after {} attempts: {}", attempt, e);
                    return Err(ConnectError::GaveUp {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let backoff_ms = self.policy.backoff_ms(attempt);
                    warn!(
                        "Connection attempt {} failed: {}, retrying in {} ms",
                        attempt, e, backoff_ms
                    );
                    delay.delay_ms(backoff_ms).await;
                }
            }
        }
    }
}

//! Application-wide run state and error types for airq

use core::fmt::Write;

use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::connection::{ConnectError, ConnectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    /// Network gave up; sampling and the local alarm keep running
    Offline,
    SensorsRunning,
}

impl AppRunState {
    /// Run state once the network bring-up has settled
    pub const fn after_connect(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => Self::WifiConnected,
            ConnectionState::GaveUp { .. } => Self::Offline,
            ConnectionState::Connecting { .. } => Self::WifiConnecting,
            ConnectionState::Disconnected => Self::Uninitialized,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("WiFi connection failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Configuration error: {0}")]
    Config(ConfigError),
    #[error("Hardware init failed: {0}")]
    Hardware(heapless::String<64>),
    #[error("Unknown error")]
    Unknown,
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<ConnectError> for AppError {
    fn from(e: ConnectError) -> Self {
        AppError::Wifi(truncated(format_args!("{}", e)))
    }
}

impl AppError {
    pub fn hardware(details: core::fmt::Arguments<'_>) -> Self {
        AppError::Hardware(truncated(details))
    }
}

/// Render into a fixed-capacity string, dropping whatever does not fit
fn truncated<const N: usize>(args: core::fmt::Arguments<'_>) -> heapless::String<N> {
    struct Truncating<'a, const N: usize>(&'a mut heapless::String<N>);

    impl<const N: usize> Write for Truncating<'_, N> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for c in s.chars() {
                if self.0.push(c).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let mut out = heapless::String::new();
    let _ = Truncating(&mut out).write_fmt(args);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::LinkError;

    #[test]
    fn test_run_state_after_connect() {
        assert_eq!(
            AppRunState::after_connect(ConnectionState::Connected),
            AppRunState::WifiConnected
        );
        assert_eq!(
            AppRunState::after_connect(ConnectionState::GaveUp { attempts: 3 }),
            AppRunState::Offline
        );
    }

    #[test]
    fn test_connect_error_message_fits() {
        let error = AppError::from(ConnectError::GaveUp {
            attempts: 10,
            last: LinkError::AuthFailed,
        });
        match error {
            AppError::Wifi(message) => {
                assert!(message.starts_with("Gave up after 10 attempts"));
                assert!(message.len() <= 64);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_long_details_are_truncated() {
        let long = "x".repeat(200);
        let error = AppError::hardware(format_args!("adc: {}", long));
        match error {
            AppError::Hardware(message) => assert_eq!(message.len(), 64),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

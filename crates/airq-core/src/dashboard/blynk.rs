//! Blynk HTTP API client
//!
//! Uses the device-token endpoints of the Blynk cloud:
//!
//! | Operation | Path |
//! |-----------|------|
//! | publish   | `/external/api/batch/update?token=T&V0=..&V4=..` |
//! | event     | `/external/api/logEvent?token=T&code=C&description=D` |
//!
//! Only request formatting and status handling live here. Sockets, DNS and
//! TLS belong to the [`HttpTransport`] the firmware provides.

use core::fmt::Write;

use log::{debug, warn};

use super::{Dashboard, DashboardError, TransportError};
use crate::alert::AlertEvent;
use crate::config::CloudConfig;
use crate::reading::Metrics;

pub const REQUEST_CAPACITY: usize = 256;

pub type RequestPath = heapless::String<REQUEST_CAPACITY>;

const BATCH_UPDATE_PATH: &str = "/external/api/batch/update";
const LOG_EVENT_PATH: &str = "/external/api/logEvent";

/// Issues a single HTTP GET and returns the response status code
pub trait HttpTransport {
    fn get(&mut self, host: &str, path: &str) -> impl Future<Output = Result<u16, TransportError>>;
}

pub struct BlynkDashboard<'a, T> {
    transport: T,
    host: &'a str,
    token: &'a str,
}

impl<'a, T: HttpTransport> BlynkDashboard<'a, T> {
    pub fn new(transport: T, cloud: &CloudConfig<'a>) -> Self {
        Self {
            transport,
            host: cloud.host,
            token: cloud.auth_token,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&mut self, path: &str) -> Result<(), DashboardError> {
        debug!("Blynk GET {}{}", self.host, path);
        let status = self.transport.get(self.host, path).await?;
        if status == 200 {
            Ok(())
        } else {
            warn!("Blynk rejected request with status {}", status);
            Err(DashboardError::Rejected(status))
        }
    }
}

impl<T: HttpTransport> Dashboard for BlynkDashboard<'_, T> {
    async fn publish(&mut self, metrics: &Metrics) -> Result<(), DashboardError> {
        let path = batch_update_path(self.token, metrics)?;
        self.send(&path).await
    }

    async fn log_event(&mut self, event: AlertEvent) -> Result<(), DashboardError> {
        let path = log_event_path(self.token, event)?;
        self.send(&path).await
    }
}

pub fn batch_update_path(token: &str, metrics: &Metrics) -> Result<RequestPath, DashboardError> {
    let mut path = RequestPath::new();
    write!(path, "{}?token=", BATCH_UPDATE_PATH).map_err(|_| DashboardError::RequestTooLong)?;
    push_encoded(&mut path, token)?;

    for (channel, value) in metrics.channels() {
        write!(path, "&V{}={}", channel.virtual_pin(), value)
            .map_err(|_| DashboardError::RequestTooLong)?;
    }
    Ok(path)
}

pub fn log_event_path(token: &str, event: AlertEvent) -> Result<RequestPath, DashboardError> {
    let mut path = RequestPath::new();
    write!(path, "{}?token=", LOG_EVENT_PATH).map_err(|_| DashboardError::RequestTooLong)?;
    push_encoded(&mut path, token)?;
    path.write_str("&code=")
        .map_err(|_| DashboardError::RequestTooLong)?;
    push_encoded(&mut path, event.code())?;
    path.write_str("&description=")
        .map_err(|_| DashboardError::RequestTooLong)?;
    push_encoded(&mut path, event.description())?;
    Ok(path)
}

/// Percent-encode everything outside the RFC 3986 unreserved set
fn push_encoded(out: &mut RequestPath, value: &str) -> Result<(), DashboardError> {
    for byte in value.bytes() {
        let result = match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.write_char(byte as char)
            }
            _ => write!(out, "%{:02X}", byte),
        };
        result.map_err(|_| DashboardError::RequestTooLong)?;
    }
    Ok(())
}

/// Write a complete HTTP/1.1 GET request for `path`
pub fn format_request<W: Write>(out: &mut W, host: &str, path: &str) -> core::fmt::Result {
    write!(
        out,
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host
    )
}

/// Status code from the first line of an HTTP response
pub fn parse_status_line(response: &[u8]) -> Option<u16> {
    let line_end = response
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(response.len());
    let line = core::str::from_utf8(&response[..line_end]).ok()?;

    let mut parts = line.split(' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use embassy_futures::block_on;
    use std::string::String;
    use std::vec::Vec;

    use super::*;

    struct RecordingTransport {
        status: Result<u16, TransportError>,
        requests: Vec<(String, String)>,
    }

    impl RecordingTransport {
        fn new(status: Result<u16, TransportError>) -> Self {
            Self {
                status,
                requests: Vec::new(),
            }
        }
    }

    impl HttpTransport for RecordingTransport {
        async fn get(&mut self, host: &str, path: &str) -> Result<u16, TransportError> {
            self.requests.push((String::from(host), String::from(path)));
            self.status
        }
    }

    fn cloud() -> CloudConfig<'static> {
        CloudConfig {
            host: "blynk.cloud",
            auth_token: "tok-123",
        }
    }

    fn metrics() -> Metrics {
        Metrics {
            temperature_celsius: 24.5,
            humidity_percent: 61.25,
            gas_raw: 900,
            co2_ppm: 2993.65,
            air_quality_index: 90,
        }
    }

    #[test]
    fn test_batch_update_path() {
        let path = batch_update_path("tok-123", &metrics()).unwrap();
        assert_eq!(
            path.as_str(),
            "/external/api/batch/update?token=tok-123&V0=24.50&V1=61.25&V2=900&V3=2993.65&V4=90"
        );
    }

    #[test]
    fn test_log_event_path_is_percent_encoded() {
        let path = log_event_path("tok-123", AlertEvent::HighCo2).unwrap();
        assert_eq!(
            path.as_str(),
            "/external/api/logEvent?token=tok-123&code=high_co2&description=ALERT%21%20High%20CO2%20levels%21"
        );
    }

    #[test]
    fn test_oversized_token_is_rejected() {
        let token: String = core::iter::repeat('x').take(REQUEST_CAPACITY).collect();
        assert_eq!(
            batch_update_path(&token, &metrics()),
            Err(DashboardError::RequestTooLong)
        );
    }

    #[test]
    fn test_publish_sends_one_request() {
        let mut dashboard = BlynkDashboard::new(RecordingTransport::new(Ok(200)), &cloud());
        block_on(dashboard.publish(&metrics())).unwrap();

        let requests = &dashboard.transport().requests;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "blynk.cloud");
        assert!(requests[0].1.starts_with("/external/api/batch/update?token=tok-123&V0="));
    }

    #[test]
    fn test_non_200_status_is_rejected() {
        let mut dashboard = BlynkDashboard::new(RecordingTransport::new(Ok(400)), &cloud());
        assert_eq!(
            block_on(dashboard.log_event(AlertEvent::PoorAirQuality)),
            Err(DashboardError::Rejected(400))
        );
    }

    #[test]
    fn test_transport_error_is_propagated() {
        let mut dashboard = BlynkDashboard::new(
            RecordingTransport::new(Err(TransportError::Connect)),
            &cloud(),
        );
        assert_eq!(
            block_on(dashboard.publish(&metrics())),
            Err(DashboardError::Transport(TransportError::Connect))
        );
    }

    #[test]
    fn test_format_request() {
        let mut out = String::new();
        format_request(&mut out, "blynk.cloud", "/external/api/logEvent?token=t").unwrap();
        assert_eq!(
            out,
            "GET /external/api/logEvent?token=t HTTP/1.1\r\nHost: blynk.cloud\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n"), Some(200));
        assert_eq!(parse_status_line(b"HTTP/1.1 400 Bad Request"), Some(400));
        assert_eq!(parse_status_line(b"garbage\r\n"), None);
        assert_eq!(parse_status_line(b""), None);
    }
}

//! Plain HTTP/1.1 GET over an embassy-net TCP socket

use airq_core::dashboard::TransportError;
use airq_core::dashboard::blynk::{HttpTransport, format_request, parse_status_line};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_time::Duration;
use log::{debug, error};

const HTTP_PORT: u16 = 80;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
const BUFFER_SIZE: usize = 1024;

/// Enough of the response to hold the status line
const STATUS_BUFFER_SIZE: usize = 64;

pub struct TcpHttpTransport {
    stack: Stack<'static>,
    rx_buffer: [u8; BUFFER_SIZE],
    tx_buffer: [u8; BUFFER_SIZE],
}

impl TcpHttpTransport {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx_buffer: [0; BUFFER_SIZE],
            tx_buffer: [0; BUFFER_SIZE],
        }
    }
}

impl HttpTransport for TcpHttpTransport {
    async fn get(&mut self, host: &str, path: &str) -> Result<u16, TransportError> {
        if !self.stack.is_config_up() {
            return Err(TransportError::Connect);
        }

        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS lookup for {} failed: {:?}", host, e);
                TransportError::Dns
            })?;
        let address = addresses.first().copied().ok_or(TransportError::Dns)?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((address, HTTP_PORT)).await.map_err(|e| {
            error!("TCP connect to {} failed: {:?}", host, e);
            TransportError::Connect
        })?;

        let mut request: heapless::String<512> = heapless::String::new();
        format_request(&mut request, host, path).map_err(|_| TransportError::Io)?;
        let mut sent = request.as_bytes();
        while !sent.is_empty() {
            let written = socket.write(sent).await.map_err(|_| TransportError::Io)?;
            if written == 0 {
                return Err(TransportError::Io);
            }
            sent = &sent[written..];
        }
        socket.flush().await.map_err(|_| TransportError::Io)?;

        let mut response = [0u8; STATUS_BUFFER_SIZE];
        let mut len = 0;
        while len < response.len() {
            let read = socket
                .read(&mut response[len..])
                .await
                .map_err(|_| TransportError::Io)?;
            if read == 0 || response[..len + read].windows(2).any(|w| w == b"\r\n") {
                len += read;
                break;
            }
            len += read;
        }
        socket.close();

        let status = parse_status_line(&response[..len]).ok_or(TransportError::MalformedResponse)?;
        debug!("GET {} -> {}", path, status);
        Ok(status)
    }
}

//! Host side of the datagram command protocol.

use super::protocol::{ACQUISITION_ACCEPTED, Command, PUMP_STATUS_REPLIES, REFERENCE_PAYLOADS};
use crate::config::TransportConfig;
use crate::error::{BridgeError, Result};
use log::{debug, info};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest datagram the client accepts.
const MAX_DATAGRAM: usize = 1500;

/// Reply to [`Command::RequestData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub acknowledgment: String,
    /// Payloads in arrival order.
    pub payloads: Vec<Vec<u8>>,
}

/// UDP client bound to one device.
pub struct CommandClient {
    socket: UdpSocket,
    recv_timeout: Duration,
}

impl CommandClient {
    /// Bind `bind_addr` and direct all traffic at `server_addr`.
    pub async fn connect(
        bind_addr: &str,
        server_addr: &str,
        recv_timeout: Duration,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server_addr).await?;
        info!(
            "Command client {} -> {}",
            socket.local_addr()?,
            socket.peer_addr()?
        );
        Ok(Self {
            socket,
            recv_timeout,
        })
    }

    pub async fn from_config(config: &TransportConfig) -> Result<Self> {
        Self::connect(
            &config.bind_addr,
            &config.server_addr,
            Duration::from_millis(config.recv_timeout_ms),
        )
        .await
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Ask the device to begin acquisition. Succeeds only on the `"1"` reply.
    pub async fn start_acquisition(&self) -> Result<()> {
        let command = Command::StartAcquisition;
        self.send(command).await?;
        let reply = self.recv_text(command).await?;
        info!("Received response: {}", reply);

        if reply == ACQUISITION_ACCEPTED {
            Ok(())
        } else {
            Err(BridgeError::UnexpectedResponse {
                command: command.to_string(),
                reply,
            })
        }
    }

    /// Request the device's reference sequences: one acknowledgment, then
    /// exactly [`REFERENCE_PAYLOADS`] payloads.
    pub async fn request_reference_data(&self) -> Result<ReferenceData> {
        let command = Command::RequestData;
        self.send(command).await?;
        let acknowledgment = self.recv_text(command).await?;
        info!("Received response: {}", acknowledgment);

        let mut payloads = Vec::with_capacity(REFERENCE_PAYLOADS);
        for _ in 0..REFERENCE_PAYLOADS {
            payloads.push(self.recv(command).await?);
        }
        Ok(ReferenceData {
            acknowledgment,
            payloads,
        })
    }

    /// Diagnostic round trip: the device echoes its pump state twice.
    /// Returns the echoed state; differing echoes are an unexpected response.
    pub async fn pump_status(&self) -> Result<String> {
        let command = Command::PumpStatus;
        self.send(command).await?;
        let mut replies = Vec::with_capacity(PUMP_STATUS_REPLIES);
        for _ in 0..PUMP_STATUS_REPLIES {
            replies.push(self.recv_text(command).await?);
        }

        match replies.split_first() {
            Some((state, rest)) if rest.iter().all(|r| r == state) => Ok(state.clone()),
            _ => Err(BridgeError::UnexpectedResponse {
                command: command.to_string(),
                reply: replies.join(","),
            }),
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.discard_stale();
        debug!("[UDP TX] {}", command);
        self.socket.send(command.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&self, command: Command) -> Result<Vec<u8>> {
        let mut buffer = [0u8; MAX_DATAGRAM];
        let len = tokio::time::timeout(self.recv_timeout, self.socket.recv(&mut buffer))
            .await
            .map_err(|_| BridgeError::ReplyTimeout(command.to_string()))??;
        debug!("[UDP RX] {} bytes", len);
        Ok(buffer[..len].to_vec())
    }

    /// Drop datagrams already queued on the socket, such as a reply that
    /// arrived after its command timed out.
    fn discard_stale(&self) {
        let mut buffer = [0u8; MAX_DATAGRAM];
        loop {
            match self.socket.try_recv(&mut buffer) {
                Ok(len) => debug!("[UDP RX] discarding {} stale bytes", len),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("[UDP RX] stale read stopped: {}", e);
                    break;
                }
            }
        }
    }

    async fn recv_text(&self, command: Command) -> Result<String> {
        let datagram = self.recv(command).await?;
        Ok(String::from_utf8_lossy(&datagram).into_owned())
    }
}

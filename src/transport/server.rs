//! Device side of the datagram command protocol.

use super::protocol::Command;
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Produces the replies for one received command, in send order.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, command: Command) -> Vec<Vec<u8>>;
}

/// Answer commands on `socket` until a receive error occurs.
///
/// Unknown commands are logged and ignored; a failed reply send is logged
/// and the remaining replies for that command are skipped.
pub async fn serve(socket: UdpSocket, handler: Arc<dyn CommandHandler>) {
    let mut buffer = [0u8; 1500];
    loop {
        let (len, peer) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                error!("[UDP RX] Error receiving command: {}", e);
                return;
            }
        };
        debug!("[UDP RX] {} bytes from {}", len, peer);

        let command = match Command::from_datagram(&buffer[..len]) {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring datagram from {}: {}", peer, e);
                continue;
            }
        };

        for reply in handler.handle(command) {
            if let Err(e) = socket.send_to(&reply, peer).await {
                warn!("Failed to reply to {} for {}: {}", peer, command, e);
                break;
            }
        }
    }
}

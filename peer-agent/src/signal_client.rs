use std::net::SocketAddr;
use std::time::Duration;

use rendezvous_proto::{decode_get_response, encode_add, ContactFrame, TERMINATOR};
use tokio::time::timeout;

use crate::agent::PeerAgent;
use crate::message_store::MessageStore;

/// How long to wait for a GET response before giving up on this round.
const GET_TIMEOUT: Duration = Duration::from_secs(2);

/// Publish our contact frame to the signal server. ADD has no response, so
/// this simply sends the datagram through the agent's one socket.
pub async fn register_self<M: MessageStore>(
    agent: &PeerAgent<M>,
    signal_server: SocketAddr,
    frame: &ContactFrame,
) -> std::io::Result<()> {
    let datagram = encode_add(frame).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    agent.send_raw(&datagram, signal_server).await
}

/// Fetch the current set of contact frames from the signal server: send a
/// GET, then read datagrams until the terminator `FF FF FF FF`. The
/// datagrams themselves are handed to us by the agent's event loop, which
/// routes anything arriving from `signal_server` into this channel instead
/// of through the peer-to-peer demultiplexer.
pub async fn fetch_peers<M: MessageStore>(
    agent: &mut PeerAgent<M>,
    signal_server: SocketAddr,
) -> std::io::Result<Vec<ContactFrame>> {
    agent.send_raw(&[0x02], signal_server).await?;

    let mut frames = Vec::new();
    loop {
        let datagram = timeout(GET_TIMEOUT, agent.recv_signal_datagram())
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "GET response timed out"))?
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "agent socket channel closed")
            })?;

        if datagram == TERMINATOR {
            break;
        }

        let entries = decode_get_response(&datagram)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        frames.extend(entries.into_iter().map(|e| e.frame));
    }

    Ok(frames)
}

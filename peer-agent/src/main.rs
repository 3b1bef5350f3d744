//! Peer Agent — STUN self-discovery, signal-server registration, and UDP
//! NAT hole-punching against other peers.

mod active_peers;
mod agent;
mod config;
mod error;
mod events;
mod holepunch;
mod message_store;
mod peer_info;
mod signal_client;
mod stun;

use std::time::Duration;

use anyhow::Context;
use rendezvous_proto::NatType;
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agent::PeerAgent;
use config::PeerConfig;
use error::AgentError;
use message_store::InMemoryMessageStore;
use peer_info::RemotePeerInfo;
use stun::RfcStunClient;

/// How often the agent re-fetches the peer list and re-registers itself with
/// the signal server; also drives the keepalive ping to active peers.
const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run().await.context("peer agent could not start")
}

async fn run() -> Result<(), AgentError> {
    let config = PeerConfig::from_env()?;
    info!(nickname = %config.nickname, bind_port = config.bind_port, "starting peer agent");

    let stun = RfcStunClient;
    let (mut agent, mut events) = PeerAgent::new(&config, &stun, InMemoryMessageStore::new()).await?;

    // Surface agent events (peer_registered / data_received) on their own
    // task so logging them never competes with the receive loop.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "agent event");
        }
    });

    let signal_server = agent.signal_server_addr();

    let contact_frame = agent
        .peer_info()
        .to_contact_frame()
        .ok_or_else(|| AgentError::InvalidAddress("IPv6 public address is unsupported".into()))?;

    if let Err(err) = signal_client::register_self(&agent, signal_server, &contact_frame).await {
        warn!(%err, "failed to register with signal server at startup");
    }

    let mut refresh = interval(REFRESH_INTERVAL);
    refresh.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            datagram = agent.recv_datagram() => {
                match datagram {
                    Ok((buf, from)) => agent.read_data(&buf, from).await,
                    Err(err) => {
                        error!(%err, "fatal: peer agent socket closed");
                        return Ok(());
                    }
                }
            }
            _ = refresh.tick() => {
                if let Err(err) = signal_client::register_self(&agent, signal_server, &contact_frame).await {
                    warn!(%err, "failed to refresh registration with signal server");
                }
                agent.ping_active_peers().await;

                match signal_client::fetch_peers(&mut agent, signal_server).await {
                    Ok(frames) => {
                        for frame in &frames {
                            if frame.nickname() == agent.peer_info().nickname {
                                continue;
                            }
                            if let Some(peer) = decode_remote_peer(frame) {
                                agent.register_peer(&peer);
                            }
                        }
                    }
                    Err(err) => warn!(%err, "failed to fetch peer list from signal server"),
                }
            }
        }
    }
}

/// Decode a contact frame fetched from the signal server back into a
/// `RemotePeerInfo`, matching the layout [`peer_info::PeerInfo::to_contact_frame`]
/// produces: nickname, NUL, 4 IPv4 bytes, 2 port bytes (big-endian), 1
/// NAT-type byte.
fn decode_remote_peer(frame: &rendezvous_proto::ContactFrame) -> Option<RemotePeerInfo> {
    let bytes = frame.as_bytes();
    let nul = bytes.iter().position(|&b| b == 0)?;
    let nickname = String::from_utf8_lossy(&bytes[..nul]).into_owned();

    let rest = &bytes[nul + 1..];
    if rest.len() < 7 {
        return None;
    }
    let ip = std::net::Ipv4Addr::new(rest[0], rest[1], rest[2], rest[3]);
    let port = u16::from_be_bytes([rest[4], rest[5]]);
    let nat_type = NatType::from_byte(rest[6])?;

    Some(RemotePeerInfo {
        nickname,
        address: std::net::SocketAddr::new(ip.into(), port),
        nat_type,
    })
}

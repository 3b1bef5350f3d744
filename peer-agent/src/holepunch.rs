use std::net::SocketAddr;
use std::sync::Arc;

use rendezvous_proto::{build_holepunch, SWEEP_PORT_RADIUS, SWEEP_SEND_DELAY};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Send one HOLEPUNCH datagram to `addr`. Used both for the normal
/// cone-style path and for the keepalive ping.
pub async fn punch_once(socket: &UdpSocket, nickname: &str, addr: SocketAddr) {
    let datagram = build_holepunch(nickname);
    if let Err(err) = socket.send_to(&datagram, addr).await {
        warn!(%addr, %err, "failed to send HOLEPUNCH");
    }
}

/// Sweep the ±[`SWEEP_PORT_RADIUS`] port window around `peer_port` on
/// `peer_ip`, skipping `our_public_port`, sending one HOLEPUNCH per port
/// with [`SWEEP_SEND_DELAY`] between sends.
///
/// Spawned as a background task so the ~10 seconds this sweep takes never
/// blocks the agent's read loop. The socket is shared via `Arc` since
/// `UdpSocket::send_to` only needs `&self`, so this task runs concurrently
/// with everything else touching the socket.
pub fn spawn_brute_sweep(
    socket: Arc<UdpSocket>,
    nickname: String,
    peer_ip: std::net::IpAddr,
    peer_port: u16,
    our_public_port: u16,
) -> tokio::task::JoinHandle<usize> {
    tokio::spawn(async move {
        let datagram = build_holepunch(&nickname);
        let min_port = peer_port.saturating_sub(SWEEP_PORT_RADIUS as u16);
        let max_port = peer_port.saturating_add(SWEEP_PORT_RADIUS as u16).min(u16::MAX);

        let mut sent = 0usize;
        for port in min_port..=max_port {
            if port == our_public_port {
                continue;
            }
            let target = SocketAddr::new(peer_ip, port);
            if let Err(err) = socket.send_to(&datagram, target).await {
                warn!(%target, %err, "failed to send HOLEPUNCH during symmetric sweep");
            } else {
                sent += 1;
            }
            tokio::time::sleep(SWEEP_SEND_DELAY).await;
        }
        debug!(sent, peer_ip = %peer_ip, peer_port, "symmetric-NAT sweep complete");
        sent
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_window_math_matches_the_spec() {
        // Peer at port 30000, our public port also 30000:
        // the window is [25000, 35000], 10001 ports, minus the one we skip
        // => 10000 sends.
        let peer_port: u16 = 30_000;
        let our_public_port: u16 = 30_000;
        let min_port = peer_port.saturating_sub(SWEEP_PORT_RADIUS as u16);
        let max_port = peer_port.saturating_add(SWEEP_PORT_RADIUS as u16);

        assert_eq!(min_port, 25_000);
        assert_eq!(max_port, 35_000);

        let total_ports = (max_port - min_port + 1) as usize;
        let sends = total_ports - usize::from(our_public_port >= min_port && our_public_port <= max_port);
        assert_eq!(total_ports, 10_001);
        assert_eq!(sends, 10_000);
    }

    #[test]
    fn sweep_window_clamps_at_port_range_edges() {
        // Near port 0: window must clamp to 0 rather than underflow.
        let low_peer_port: u16 = 1_000;
        assert_eq!(low_peer_port.saturating_sub(SWEEP_PORT_RADIUS as u16), 0);

        // Near port 65535: window must clamp to u16::MAX rather than overflow.
        let high_peer_port: u16 = 64_000;
        assert_eq!(
            high_peer_port.saturating_add(SWEEP_PORT_RADIUS as u16).min(u16::MAX),
            u16::MAX
        );
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use rendezvous_proto::NatType;
use rand::RngCore;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::AgentError;

const STUN_TIMEOUT: Duration = Duration::from_secs(2);
const STUN_MAGIC_COOKIE: [u8; 4] = [0x21, 0x12, 0xA4, 0x42];
const XOR_MAPPED_ADDRESS: u16 = 0x0020;

/// Narrow interface onto the STUN collaborator: `get_address` for
/// our own public `(ip, port)`, `get_nat_type` for our NAT class. Out of
/// scope for the rendezvous/NAT-traversal core itself, but expressed as
/// a trait so it can be swapped or mocked without touching agent logic.
#[async_trait]
pub trait StunClient: Send + Sync {
    async fn get_address(
        &self,
        socket: &UdpSocket,
        server_addr: SocketAddr,
    ) -> Result<SocketAddr, AgentError>;

    async fn get_nat_type(
        &self,
        socket: &UdpSocket,
        servers: &[SocketAddr],
    ) -> Result<NatType, AgentError>;
}

/// Minimal RFC 5389 STUN Binding Request/Response client, good enough to
/// classify NAT behavior from two independent probes: the mapped address is
/// stable across probes under a cone-style NAT (`Common`), and varies under
/// a NAT that rewrites the source port per destination (`Symmetric`).
#[derive(Debug, Default, Clone, Copy)]
pub struct RfcStunClient;

#[async_trait]
impl StunClient for RfcStunClient {
    async fn get_address(
        &self,
        socket: &UdpSocket,
        server_addr: SocketAddr,
    ) -> Result<SocketAddr, AgentError> {
        binding_request(socket, server_addr).await
    }

    async fn get_nat_type(
        &self,
        socket: &UdpSocket,
        servers: &[SocketAddr],
    ) -> Result<NatType, AgentError> {
        let first_server = *servers.first().ok_or(AgentError::NoStunServers)?;
        let second_server = servers.get(1).copied().unwrap_or(first_server);

        let observed_1 = binding_request(socket, first_server).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let observed_2 = binding_request(socket, second_server).await?;

        if observed_1 == observed_2 {
            Ok(NatType::Common)
        } else {
            Ok(NatType::Symmetric)
        }
    }
}

/// Send one STUN Binding Request and parse the XOR-MAPPED-ADDRESS out of the
/// response. IPv4 only, per the crate's non-goals.
async fn binding_request(socket: &UdpSocket, server_addr: SocketAddr) -> Result<SocketAddr, AgentError> {
    let mut request = [0u8; 20];
    request[0] = 0x00;
    request[1] = 0x01; // Binding Request
    request[2] = 0x00;
    request[3] = 0x00; // Message Length = 0
    request[4..8].copy_from_slice(&STUN_MAGIC_COOKIE);
    rand::thread_rng().fill_bytes(&mut request[8..20]);

    socket
        .send_to(&request, server_addr)
        .await
        .map_err(|e| stun_err(server_addr, e))?;

    let mut buf = [0u8; 256];
    let (size, _) = timeout(STUN_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .map_err(|_| AgentError::Stun {
            server: server_addr.to_string(),
            reason: "timed out waiting for STUN response".into(),
        })?
        .map_err(|e| stun_err(server_addr, e))?;

    parse_xor_mapped_address(&buf[..size]).ok_or_else(|| AgentError::Stun {
        server: server_addr.to_string(),
        reason: "response had no XOR-MAPPED-ADDRESS attribute".into(),
    })
}

fn stun_err(server_addr: SocketAddr, source: std::io::Error) -> AgentError {
    AgentError::Stun {
        server: server_addr.to_string(),
        reason: source.to_string(),
    }
}

fn parse_xor_mapped_address(message: &[u8]) -> Option<SocketAddr> {
    if message.len() < 20 {
        return None;
    }
    let mut i = 20;
    while i + 4 <= message.len() {
        let attr_type = u16::from_be_bytes([message[i], message[i + 1]]);
        let attr_len = u16::from_be_bytes([message[i + 2], message[i + 3]]) as usize;
        i += 4;
        if i + attr_len > message.len() {
            break;
        }

        if attr_type == XOR_MAPPED_ADDRESS && attr_len >= 8 {
            let family = message[i + 1];
            if family != 0x01 {
                return None; // IPv6 unsupported.
            }
            let xor_port = u16::from_be_bytes([message[i + 2], message[i + 3]]);
            let port = xor_port ^ u16::from_be_bytes([STUN_MAGIC_COOKIE[0], STUN_MAGIC_COOKIE[1]]);

            let ip = [
                message[i + 4] ^ STUN_MAGIC_COOKIE[0],
                message[i + 5] ^ STUN_MAGIC_COOKIE[1],
                message[i + 6] ^ STUN_MAGIC_COOKIE[2],
                message[i + 7] ^ STUN_MAGIC_COOKIE[3],
            ];

            return Some(SocketAddr::from((ip, port)));
        }

        i += attr_len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_xor_mapped_address() {
        // Header (20 bytes): type/length/cookie/transaction id (content doesn't matter here).
        let mut message = vec![0u8; 20];
        message[4..8].copy_from_slice(&STUN_MAGIC_COOKIE);

        // XOR-MAPPED-ADDRESS attribute: type, length=8, reserved+family, xor port, xor ip.
        message.extend_from_slice(&XOR_MAPPED_ADDRESS.to_be_bytes());
        message.extend_from_slice(&8u16.to_be_bytes());
        message.push(0x00); // reserved
        message.push(0x01); // IPv4
        let port = 51_820u16;
        let xor_port = port ^ u16::from_be_bytes([STUN_MAGIC_COOKIE[0], STUN_MAGIC_COOKIE[1]]);
        message.extend_from_slice(&xor_port.to_be_bytes());
        let ip = [203, 0, 113, 9];
        for (byte, cookie_byte) in ip.iter().zip(STUN_MAGIC_COOKIE.iter()) {
            message.push(byte ^ cookie_byte);
        }

        let addr = parse_xor_mapped_address(&message).unwrap();
        assert_eq!(addr, SocketAddr::from(([203, 0, 113, 9], 51_820)));
    }

    #[test]
    fn returns_none_without_the_attribute() {
        let message = vec![0u8; 20];
        assert!(parse_xor_mapped_address(&message).is_none());
    }
}

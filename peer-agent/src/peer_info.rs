use std::net::SocketAddr;

use rendezvous_proto::{ContactFrame, NatType};

/// This agent's own reachability description, set once from the STUN probe
/// at construction time and immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub nickname: String,
    pub public_address: SocketAddr,
    pub nat_type: NatType,
}

impl PeerInfo {
    /// Build the contact frame this agent publishes to the signal server:
    /// the nickname, NUL-terminated, followed by the public IPv4 address
    /// and a NAT-type byte. Only IPv4 is supported.
    pub fn to_contact_frame(&self) -> Option<ContactFrame> {
        let SocketAddr::V4(addr) = self.public_address else {
            return None;
        };
        let mut bytes = self.nickname.clone().into_bytes();
        bytes.push(0);
        bytes.extend_from_slice(&addr.ip().octets());
        bytes.extend_from_slice(&addr.port().to_be_bytes());
        bytes.push(self.nat_type.as_byte());
        Some(ContactFrame::new(bytes))
    }
}

/// A remote peer's reachability description, as learned from the signal
/// server's GET response or handed in directly by a caller.
#[derive(Debug, Clone)]
pub struct RemotePeerInfo {
    pub nickname: String,
    pub address: SocketAddr,
    pub nat_type: NatType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_frame_starts_with_nul_terminated_nickname() {
        let info = PeerInfo {
            nickname: "alice".into(),
            public_address: "203.0.113.9:4000".parse().unwrap(),
            nat_type: NatType::Common,
        };
        let frame = info.to_contact_frame().unwrap();
        assert_eq!(frame.nickname(), "alice");
        assert_eq!(&frame.as_bytes()[..6], b"alice\x00");
    }
}

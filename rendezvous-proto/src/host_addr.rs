/// A remote endpoint as the peer protocol talks about it: a textual IP
/// address plus a port, rather than `std::net::SocketAddr`, since the source
/// protocol carries the address as a bare string inside contact frames and
/// HOLEPUNCH bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddress {
    pub ip: String,
    pub port: u16,
}

impl HostAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }
}

impl From<std::net::SocketAddr> for HostAddress {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self {
            ip: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl std::fmt::Display for HostAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// NAT behavior as classified by the STUN collaborator. Only these two
/// classes are defined by the protocol; anything else the STUN probe might
/// report must be mapped to one of them before it reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatType {
    /// Cone-style NAT: source port is stable across destinations, so a
    /// single HOLEPUNCH at the advertised address is expected to land.
    Common,
    /// Symmetric NAT: source port is rewritten per destination, so a sweep
    /// of nearby ports is required to find the live mapping.
    Symmetric,
}

impl NatType {
    pub fn as_byte(self) -> u8 {
        match self {
            NatType::Common => 0x00,
            NatType::Symmetric => 0x01,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(NatType::Common),
            0x01 => Some(NatType::Symmetric),
            _ => None,
        }
    }
}

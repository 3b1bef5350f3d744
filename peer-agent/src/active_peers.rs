use std::collections::HashMap;
use std::net::SocketAddr;

/// The peer agent's remote-peer table: `nickname -> SocketAddr`, with a
/// reverse index maintained alongside it so every inbound-datagram lookup is
/// O(1) rather than a linear scan over peers.
///
/// Not behind a lock: owned by the single task running the agent's event
/// loop, which is the only thing that ever touches it.
#[derive(Debug, Default)]
pub struct ActivePeers {
    by_nickname: HashMap<String, SocketAddr>,
    by_address: HashMap<SocketAddr, String>,
}

impl ActivePeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nickname.is_empty()
    }

    pub fn contains_address(&self, addr: &SocketAddr) -> bool {
        self.by_address.contains_key(addr)
    }

    /// Insert a newly learned peer. Returns `true` if this was a new entry
    /// and `false` if the address was already known (HOLEPUNCH idempotence,
    /// callers use this to decide whether to emit
    /// `peer_registered`.
    pub fn insert(&mut self, nickname: String, addr: SocketAddr) -> bool {
        if self.by_address.contains_key(&addr) {
            return false;
        }
        self.by_address.insert(addr, nickname.clone());
        self.by_nickname.insert(nickname, addr);
        true
    }

    pub fn nickname_of(&self, addr: &SocketAddr) -> Option<&str> {
        self.by_address.get(addr).map(String::as_str)
    }

    pub fn address_of(&self, nickname: &str) -> Option<SocketAddr> {
        self.by_nickname.get(nickname).copied()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &SocketAddr> {
        self.by_nickname.values()
    }

    pub fn remove(&mut self, nickname: &str) -> Option<SocketAddr> {
        let addr = self.by_nickname.remove(nickname)?;
        self.by_address.remove(&addr);
        Some(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn first_insert_is_new_second_is_idempotent() {
        let mut peers = ActivePeers::new();
        assert!(peers.insert("bob".into(), addr(4000)));
        assert!(!peers.insert("bob".into(), addr(4000)));
        assert_eq!(peers.nickname_of(&addr(4000)), Some("bob"));
        assert_eq!(peers.address_of("bob"), Some(addr(4000)));
    }

    #[test]
    fn forward_and_reverse_indices_stay_in_sync() {
        let mut peers = ActivePeers::new();
        peers.insert("bob".into(), addr(4000));
        peers.insert("carol".into(), addr(4001));

        assert_eq!(peers.remove("bob"), Some(addr(4000)));
        assert!(peers.nickname_of(&addr(4000)).is_none());
        assert_eq!(peers.address_of("carol"), Some(addr(4001)));
    }
}

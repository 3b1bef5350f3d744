use std::net::SocketAddr;
use std::sync::Arc;

use rendezvous_proto::{parse_holepunch, NatType, BUFFER_SIZE};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::info;

use crate::active_peers::ActivePeers;
use crate::config::PeerConfig;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::holepunch::{punch_once, spawn_brute_sweep};
use crate::message_store::MessageStore;
use crate::peer_info::{PeerInfo, RemotePeerInfo};
use crate::stun::StunClient;

/// The peer agent: one UDP socket, one immutable self-description, and the
/// mutable remote-peer / message-store state that only the event loop
/// touches.
pub struct PeerAgent<M: MessageStore> {
    socket: Arc<UdpSocket>,
    peer_info: PeerInfo,
    signal_server_addr: SocketAddr,
    active_peers: ActivePeers,
    message_store: M,
    events: mpsc::UnboundedSender<AgentEvent>,
    signal_tx: mpsc::UnboundedSender<Vec<u8>>,
    signal_rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl<M: MessageStore> PeerAgent<M> {
    /// Construct the agent: bind the socket, run the STUN probe for
    /// our own public address and NAT type, and store it as immutable
    /// `peer_info`. Both steps are fatal on failure.
    pub async fn new(
        config: &PeerConfig,
        stun: &impl StunClient,
        message_store: M,
    ) -> Result<(Self, mpsc::UnboundedReceiver<AgentEvent>), AgentError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.bind_port))
            .await
            .map_err(|source| AgentError::Bind {
                port: config.bind_port,
                source,
            })?;

        let stun_servers: Vec<SocketAddr> = config
            .stun_servers
            .iter()
            .map(|s| resolve(s))
            .collect::<Result<_, _>>()?;

        let signal_server_addr = resolve(&config.signal_server_addr)?;

        let public_address = stun.get_address(&socket, stun_servers[0]).await?;
        let nat_type = stun.get_nat_type(&socket, &stun_servers).await?;

        info!(
            nickname = %config.nickname,
            %public_address,
            nat_type = ?nat_type,
            "peer agent ready"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let agent = Self {
            socket: Arc::new(socket),
            peer_info: PeerInfo {
                nickname: config.nickname.clone(),
                public_address,
                nat_type,
            },
            signal_server_addr,
            active_peers: ActivePeers::new(),
            message_store,
            events: events_tx,
            signal_tx,
            signal_rx,
        };

        Ok((agent, events_rx))
    }

    pub fn peer_info(&self) -> &PeerInfo {
        &self.peer_info
    }

    /// The resolved address of the signal server this agent registers with,
    /// as determined once at construction time.
    pub fn signal_server_addr(&self) -> SocketAddr {
        self.signal_server_addr
    }

    /// The local address this agent's socket is bound to. Mainly useful for
    /// tests that drive the agent from a second, independent `UdpSocket`.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Drive one inbound datagram through the demultiplexer: traffic from
    /// the signal server is routed to whatever is waiting on
    /// [`recv_signal_datagram`](Self::recv_signal_datagram); everything else
    /// is peer-to-peer traffic, further split into HOLEPUNCH vs. user data
    /// by its first four bytes. All three kinds share this one socket.
    pub async fn read_data(&mut self, datagram: &[u8], from: SocketAddr) {
        if from == self.signal_server_addr {
            let _ = self.signal_tx.send(datagram.to_vec());
            return;
        }

        match parse_holepunch(datagram) {
            Some(nickname) => self.handle_holepunch(nickname.to_string(), from).await,
            None => self.handle_user_data(datagram, from).await,
        }
    }

    async fn handle_holepunch(&mut self, nickname: String, from: SocketAddr) {
        if self.active_peers.contains_address(&from) {
            // Duplicate HOLEPUNCH from a known address: idempotent no-op.
            return;
        }

        punch_once(&self.socket, &self.peer_info.nickname, from).await;

        self.active_peers.insert(nickname.clone(), from);
        info!(nickname, %from, "registered new active peer");
        let _ = self.events.send(AgentEvent::PeerRegistered { nickname });
    }

    async fn handle_user_data(&mut self, payload: &[u8], from: SocketAddr) {
        let nickname = self.active_peers.nickname_of(&from).unwrap_or("").to_string();
        self.message_store
            .record(&nickname, &self.peer_info.nickname, payload);
        let _ = self.events.send(AgentEvent::DataReceived {
            payload: payload.to_vec(),
            from: nickname,
        });
    }

    /// Dispatch on a learned remote peer's NAT type: `Common` gets
    /// one direct HOLEPUNCH, `Symmetric` gets the brute-force port sweep run
    /// as a background task so it never blocks the event loop.
    pub fn register_peer(&self, peer: &RemotePeerInfo) {
        match peer.nat_type {
            NatType::Common => {
                let socket = self.socket.clone();
                let nickname = self.peer_info.nickname.clone();
                let addr = peer.address;
                tokio::spawn(async move { punch_once(&socket, &nickname, addr).await });
            }
            NatType::Symmetric => {
                spawn_brute_sweep(
                    self.socket.clone(),
                    self.peer_info.nickname.clone(),
                    peer.address.ip(),
                    peer.address.port(),
                    self.peer_info.public_address.port(),
                );
            }
        }
    }

    /// Keep every active peer's NAT mapping warm with a normal HOLEPUNCH.
    /// No-op if there are no active peers.
    pub async fn ping_active_peers(&self) {
        for addr in self.active_peers.addresses() {
            punch_once(&self.socket, &self.peer_info.nickname, *addr).await;
        }
    }

    /// Send a user datagram directly to a peer, recording it in the message
    /// store with `from = self.nickname`.
    pub async fn send_data(&mut self, buf: &[u8], addr: SocketAddr) -> std::io::Result<()> {
        self.socket.send_to(buf, addr).await?;
        let to = self.active_peers.nickname_of(&addr).unwrap_or("").to_string();
        self.message_store.record(&self.peer_info.nickname, &to, buf);
        Ok(())
    }

    /// Send a raw datagram to an arbitrary address through the agent's one
    /// socket, bypassing the message store. Used for signal-server ADD/GET
    /// traffic, which is protocol bookkeeping rather than user data.
    pub async fn send_raw(&self, buf: &[u8], addr: SocketAddr) -> std::io::Result<()> {
        self.socket.send_to(buf, addr).await?;
        Ok(())
    }

    /// Wait for the next datagram `read_data` routed from the signal server.
    /// `None` means the agent's event-loop side of the channel was dropped.
    pub async fn recv_signal_datagram(&mut self) -> Option<Vec<u8>> {
        self.signal_rx.recv().await
    }

    /// Wait for one inbound datagram. Only borrows the socket handle, not
    /// the rest of the agent, so a caller can combine this with other
    /// `&mut self` work (keepalive ticks, peer registration) in the same
    /// `tokio::select!` loop without holding a borrow across iterations —
    /// see `peer-agent`'s `main` for that loop. This is the socket side of
    /// the "single event loop" model; `active_peers` and the message
    /// store are only ever touched from the task that awaits this.
    pub async fn recv_datagram(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; BUFFER_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, from))
    }
}

fn resolve(server: &str) -> Result<SocketAddr, AgentError> {
    server
        .to_socket_addrs_blocking()
        .ok_or_else(|| AgentError::InvalidAddress(server.to_string()))
}

/// Small helper so STUN server strings can be either a literal `ip:port` or
/// a DNS name (`stun.l.google.com:19302`) without pulling in an async
/// resolver crate for what's otherwise a one-shot startup lookup.
trait ResolveBlocking {
    fn to_socket_addrs_blocking(&self) -> Option<SocketAddr>;
}

impl ResolveBlocking for str {
    fn to_socket_addrs_blocking(&self) -> Option<SocketAddr> {
        use std::net::ToSocketAddrs;
        self.to_socket_addrs().ok()?.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_store::InMemoryMessageStore;
    use async_trait::async_trait;

    struct FixedStun {
        address: SocketAddr,
        nat_type: NatType,
    }

    #[async_trait]
    impl StunClient for FixedStun {
        async fn get_address(
            &self,
            _socket: &UdpSocket,
            _server_addr: SocketAddr,
        ) -> Result<SocketAddr, AgentError> {
            Ok(self.address)
        }

        async fn get_nat_type(
            &self,
            _socket: &UdpSocket,
            _servers: &[SocketAddr],
        ) -> Result<NatType, AgentError> {
            Ok(self.nat_type)
        }
    }

    async fn make_agent(nat_type: NatType) -> PeerAgent<InMemoryMessageStore> {
        let config = PeerConfig {
            nickname: "alice".into(),
            bind_port: 0,
            stun_servers: vec!["127.0.0.1:19302".into()],
            signal_server_addr: "127.0.0.1:9000".into(),
        };
        let stun = FixedStun {
            address: SocketAddr::from(([203, 0, 113, 1], 4000)),
            nat_type,
        };
        let (agent, _events) = PeerAgent::new(&config, &stun, InMemoryMessageStore::new())
            .await
            .unwrap();
        agent
    }

    #[tokio::test]
    async fn s5_inbound_holepunch_registers_peer_once_and_replies() {
        let mut agent = make_agent(NatType::Common).await;
        let from = SocketAddr::from(([127, 0, 0, 1], 5555));

        let datagram = rendezvous_proto::build_holepunch("bob");
        agent.read_data(&datagram, from).await;
        agent.read_data(&datagram, from).await; // duplicate: must be a no-op

        assert_eq!(agent.active_peers.address_of("bob"), Some(from));
        assert_eq!(agent.active_peers.nickname_of(&from), Some("bob"));
    }

    #[tokio::test]
    async fn s5_handshake_over_a_real_socket_replies_with_a_real_holepunch() {
        let mut agent = make_agent(NatType::Common).await;
        let agent_addr = agent.local_addr().unwrap();
        let peer_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        peer_b
            .send_to(&rendezvous_proto::build_holepunch("bob"), agent_addr)
            .await
            .unwrap();
        let (datagram, from) = agent.recv_datagram().await.unwrap();
        agent.read_data(&datagram, from).await;

        let mut buf = [0u8; BUFFER_SIZE];
        let (len, reply_from) = peer_b.recv_from(&mut buf).await.unwrap();
        assert_eq!(reply_from, agent_addr);
        assert_eq!(rendezvous_proto::parse_holepunch(&buf[..len]), Some("alice"));
        assert_eq!(agent.active_peers.address_of("bob"), Some(from));
    }

    #[tokio::test]
    async fn register_peer_common_nat_sends_exactly_one_holepunch() {
        let agent = make_agent(NatType::Common).await;
        let peer_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer_b.local_addr().unwrap();

        agent.register_peer(&RemotePeerInfo {
            nickname: "bob".into(),
            address: peer_addr,
            nat_type: NatType::Common,
        });

        let mut buf = [0u8; BUFFER_SIZE];
        let (len, _) = tokio::time::timeout(std::time::Duration::from_secs(1), peer_b.recv_from(&mut buf))
            .await
            .expect("common-NAT dispatch should send a direct HOLEPUNCH")
            .unwrap();
        assert_eq!(rendezvous_proto::parse_holepunch(&buf[..len]), Some("alice"));

        // A single HOLEPUNCH, not a sweep: nothing else should follow.
        let second = tokio::time::timeout(std::time::Duration::from_millis(100), peer_b.recv_from(&mut buf)).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn register_peer_symmetric_nat_starts_a_port_sweep() {
        use rendezvous_proto::SWEEP_PORT_RADIUS;

        let agent = make_agent(NatType::Common).await;
        let peer_b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_local = peer_b.local_addr().unwrap();

        // The sweep walks its window bottom-up, so parking the bound peer
        // port at the bottom (by reporting a center port `radius` above it)
        // means its datagram is the very first one sent, instead of waiting
        // out the whole multi-second sweep to reach the real center.
        let center_port = peer_local.port().saturating_add(SWEEP_PORT_RADIUS as u16);

        agent.register_peer(&RemotePeerInfo {
            nickname: "bob".into(),
            address: SocketAddr::new(peer_local.ip(), center_port),
            nat_type: NatType::Symmetric,
        });

        let mut buf = [0u8; BUFFER_SIZE];
        let (len, _) = tokio::time::timeout(std::time::Duration::from_secs(1), peer_b.recv_from(&mut buf))
            .await
            .expect("symmetric-NAT dispatch should start a brute-force sweep")
            .unwrap();
        assert_eq!(rendezvous_proto::parse_holepunch(&buf[..len]), Some("alice"));
    }

    #[tokio::test]
    async fn unknown_sender_user_data_is_stored_with_empty_from() {
        let mut agent = make_agent(NatType::Common).await;
        let from = SocketAddr::from(([127, 0, 0, 1], 6666));

        agent.read_data(b"hello", from).await;

        assert_eq!(agent.message_store.messages().len(), 1);
        assert_eq!(agent.message_store.messages()[0].from, "");
        assert_eq!(agent.message_store.messages()[0].payload, b"hello");
    }

    #[tokio::test]
    async fn ping_active_peers_is_a_no_op_when_empty() {
        let agent = make_agent(NatType::Common).await;
        // Should simply return without sending anything or panicking.
        agent.ping_active_peers().await;
        assert!(agent.active_peers.is_empty());
    }
}

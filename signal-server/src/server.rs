use std::net::SocketAddr;
use std::sync::Arc;

use rendezvous_proto::{
    decode_add_body, encode_get_frames, Opcode, BUFFER_SIZE, SWEEP_INTERVAL, WORKER_POOL_SIZE,
};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::error::ServerError;
use crate::registry::ClientRegistry;

/// The signal server: one UDP socket, one client registry, one acceptor
/// loop, a bounded worker pool, and a periodic eviction sweeper.
pub struct SignalServer {
    socket: Arc<UdpSocket>,
    registry: Arc<ClientRegistry>,
    workers: Arc<Semaphore>,
}

impl SignalServer {
    pub async fn bind(bind_address: &str, port: u16) -> Result<Self, ServerError> {
        let addr = format!("{bind_address}:{port}");
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            socket: Arc::new(socket),
            registry: Arc::new(ClientRegistry::new()),
            workers: Arc::new(Semaphore::new(WORKER_POOL_SIZE)),
        })
    }

    /// Run the acceptor loop and the eviction sweeper concurrently. Returns
    /// only on a fatal socket error; a `recv_from` error has no recovery path
    /// once the socket itself has gone bad, so it ends the server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let sweeper = {
            let registry = self.registry.clone();
            tokio::spawn(async move {
                sweep_loop(registry).await;
            })
        };

        let accept_result = self.accept_loop().await;
        sweeper.abort();
        accept_result
    }

    async fn accept_loop(&self) -> Result<(), std::io::Error> {
        let mut buf = vec![0u8; BUFFER_SIZE];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }

            let opcode = match Opcode::parse(buf[0]) {
                Ok(op) => op,
                Err(err) => {
                    debug!(%err, %from, "ignoring unrecognized opcode");
                    continue;
                }
            };

            let datagram = buf[..len].to_vec();
            let socket = self.socket.clone();
            let registry = self.registry.clone();
            let workers = self.workers.clone();

            // Bounded worker pool: acquire a permit before spawning so at
            // most WORKER_POOL_SIZE ADD/GET handlers run concurrently.
            let permit = workers.acquire_owned().await.expect("semaphore never closed");
            tokio::spawn(async move {
                let _permit = permit;
                match opcode {
                    Opcode::Add => process_add(&registry, &datagram).await,
                    Opcode::Get => process_get(&socket, &registry, from).await,
                }
            });
        }
    }
}

/// Validate and upsert an ADD datagram's contact frame. Malformed input is
/// silently dropped; nothing is ever sent back to an ADD sender.
async fn process_add(registry: &ClientRegistry, datagram: &[u8]) {
    match decode_add_body(&datagram[1..]) {
        Ok(frame) => {
            let nickname = frame.nickname();
            registry.upsert(nickname.clone(), frame).await;
            info!(nickname, "added contact frame");
        }
        Err(err) => {
            debug!(%err, "dropped malformed ADD datagram");
        }
    }
}

/// Reply to a GET with every stored frame, packed into one or more datagrams, followed by the
/// terminator datagram. Send failures are logged and do not abort the
/// service.
async fn process_get(socket: &UdpSocket, registry: &ClientRegistry, from: SocketAddr) {
    let frames = registry.snapshot_frames().await;
    info!(%from, count = frames.len(), "sending GET response");

    for datagram in encode_get_frames(frames.iter()) {
        if let Err(err) = socket.send_to(&datagram, from).await {
            warn!(%from, %err, "failed to send GET response datagram");
            return;
        }
    }
}

async fn sweep_loop(registry: Arc<ClientRegistry>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    // The first tick fires immediately; skip it so we don't sweep an empty
    // registry the instant the server starts.
    interval.tick().await;
    loop {
        interval.tick().await;
        let evicted = registry.evict_stale().await;
        for nickname in &evicted {
            info!(nickname, "evicted stale client");
        }
        if !evicted.is_empty() {
            info!(total = registry.len().await, "clients online after sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_proto::{decode_get_response, encode_add, ContactFrame, TERMINATOR};
    use tokio::net::UdpSocket as ClientSocket;

    async fn spawn_server() -> SocketAddr {
        let server = SignalServer::bind("127.0.0.1", 0).await.unwrap();
        let addr = server.socket.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    #[tokio::test]
    async fn s1_register_then_retrieve_round_trip() {
        let server_addr = spawn_server().await;
        let client = ClientSocket::bind("127.0.0.1:0").await.unwrap();

        let frame = ContactFrame::new(b"alice".to_vec());
        client
            .send_to(&encode_add(&frame).unwrap(), server_addr)
            .await
            .unwrap();

        // Let the ADD worker run before we GET.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        client.send_to(&[0x02], server_addr).await.unwrap();

        let mut buf = vec![0u8; BUFFER_SIZE];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let entries = decode_get_response(&buf[..len]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].frame, frame);

        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &TERMINATOR);
    }

    #[tokio::test]
    async fn s2_zero_length_add_is_rejected() {
        let server_addr = spawn_server().await;
        let client = ClientSocket::bind("127.0.0.1:0").await.unwrap();

        client.send_to(&[0x01, 0x00, 0x00], server_addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        client.send_to(&[0x02], server_addr).await.unwrap();
        let mut buf = vec![0u8; BUFFER_SIZE];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &TERMINATOR);
    }
}

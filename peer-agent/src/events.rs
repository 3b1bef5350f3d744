/// Notifications the agent emits as it processes inbound datagrams, handed
/// out over an `mpsc` channel to whatever UI or orchestration layer embeds
/// the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A new peer completed its first HOLEPUNCH handshake and is now active.
    PeerRegistered { nickname: String },
    /// A user-data datagram arrived. `from` is empty if the sender wasn't a
    /// recognized active peer.
    DataReceived { payload: Vec<u8>, from: String },
}

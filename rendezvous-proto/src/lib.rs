//! Wire protocol shared between `signal-server` and `peer-agent`.
//!
//! Everything in this crate is about bytes on the wire, not about sockets or
//! concurrency: opcodes, the 1024-byte datagram budget, contact-frame framing
//! for the signal channel, and the HOLEPUNCH magic prefix for the peer
//! channel. Both binaries depend on this crate so the two sides can never
//! drift out of sync on a detail like the terminator bytes or the length
//! prefix's endianness.

mod contact_frame;
mod error;
mod holepunch;
mod host_addr;
mod wire;

pub use contact_frame::ContactFrame;
pub use error::ProtoError;
pub use holepunch::{build_holepunch, parse_holepunch, HOLEPUNCH_PREFIX};
pub use host_addr::{HostAddress, NatType};
pub use wire::{decode_get_response, encode_add, encode_get_frames, GetEntry, Opcode, TERMINATOR};

/// Maximum size of any datagram exchanged with the signal server.
pub const BUFFER_SIZE: usize = 1024;

/// How long a client record may go unrefreshed before the sweeper evicts it.
pub const IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// How often the signal server's sweeper task runs.
///
/// Intentionally equal to [`IDLE_TIMEOUT`]: a client that stops ADDing is
/// evicted within exactly one sweep window, never two.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Size of the signal server's bounded worker pool for ADD/GET handling.
pub const WORKER_POOL_SIZE: usize = 4;

/// Half-width of the symmetric-NAT port sweep window (±5000 around the
/// peer's advertised port).
pub const SWEEP_PORT_RADIUS: u32 = 5_000;

/// Pacing delay between sends in the symmetric-NAT sweep.
pub const SWEEP_SEND_DELAY: std::time::Duration = std::time::Duration::from_millis(1);

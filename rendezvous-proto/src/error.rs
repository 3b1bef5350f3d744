use thiserror::Error;

/// Errors that can arise while encoding or decoding wire frames.
///
/// Malformed-input variants are never surfaced to a remote peer; the signal
/// server and peer agent both treat them as "drop the datagram" per the
/// protocol's one-way-lossy error policy. They exist here so that unit tests
/// can assert on the exact rejection reason.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("datagram shorter than the opcode+length header")]
    Truncated,

    #[error("declared frame length {0} is zero")]
    EmptyFrame(usize),

    #[error("declared frame length {length} does not fit in a {buffer_size}-byte datagram")]
    FrameTooLarge { length: usize, buffer_size: usize },

    #[error("datagram body shorter than the declared frame length")]
    ShortBody,

    #[error("unrecognized opcode 0x{0:02x}")]
    UnknownOpcode(u8),
}

use crate::{ContactFrame, ProtoError, BUFFER_SIZE};

/// First byte of every datagram sent to the signal server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add = 0x01,
    Get = 0x02,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Opcode::Add),
            0x02 => Some(Opcode::Get),
            _ => None,
        }
    }

    /// Like [`from_byte`](Self::from_byte), but returns the typed rejection
    /// reason instead of `None` so a caller can log or test exactly which
    /// byte was rejected.
    pub fn parse(b: u8) -> Result<Self, ProtoError> {
        Self::from_byte(b).ok_or(ProtoError::UnknownOpcode(b))
    }
}

/// Four `0xFF` bytes that always close out a GET response, after the last
/// (possibly zero) data datagram.
pub const TERMINATOR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Build the `0x01 | len_hi | len_lo | frame` datagram a peer sends to
/// register or refresh a contact frame.
///
/// Returns an error rather than panicking so a caller can decide whether an
/// oversized frame is a bug worth logging; the signal server performs the
/// same validation on the receive side independently.
pub fn encode_add(frame: &ContactFrame) -> Result<Vec<u8>, ProtoError> {
    let len = frame.len();
    if len == 0 {
        return Err(ProtoError::EmptyFrame(len));
    }
    if len >= BUFFER_SIZE - 3 {
        return Err(ProtoError::FrameTooLarge {
            length: len,
            buffer_size: BUFFER_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(3 + len);
    buf.push(Opcode::Add as u8);
    buf.push((len >> 8) as u8);
    buf.push((len & 0xFF) as u8);
    buf.extend_from_slice(frame.as_bytes());
    Ok(buf)
}

/// Parse an inbound ADD datagram's body (the bytes after the opcode) into
/// the validated contact frame.
pub fn decode_add_body(body: &[u8]) -> Result<ContactFrame, ProtoError> {
    if body.len() < 2 {
        return Err(ProtoError::Truncated);
    }
    let length = ((body[0] as usize) << 8) | body[1] as usize;
    if length == 0 {
        return Err(ProtoError::EmptyFrame(length));
    }
    if length >= BUFFER_SIZE - 3 {
        return Err(ProtoError::FrameTooLarge {
            length,
            buffer_size: BUFFER_SIZE,
        });
    }
    let frame_bytes = &body[2..];
    if frame_bytes.len() < length {
        return Err(ProtoError::ShortBody);
    }
    Ok(ContactFrame::new(frame_bytes[..length].to_vec()))
}

/// One stored frame as packed into a GET response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetEntry {
    pub frame: ContactFrame,
}

/// Pack a set of stored frames into the sequence of GET-response datagrams
/// flush and start a new datagram whenever the next
/// `(2 + frame.len())` bytes would overflow [`BUFFER_SIZE`], and always
/// append the terminator as its own final datagram.
///
/// Iteration order over `frames` is preserved in the output but the server
/// makes no promise about what order it iterates clients in, so callers must
/// not depend on frame order surviving a round trip through a live server.
pub fn encode_get_frames<'a, I>(frames: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = &'a ContactFrame>,
{
    let mut datagrams = Vec::new();
    let mut current = Vec::new();

    for frame in frames {
        let entry_len = 2 + frame.len();
        if !current.is_empty() && current.len() + entry_len > BUFFER_SIZE {
            datagrams.push(std::mem::take(&mut current));
        }
        let len = frame.len();
        current.push((len >> 8) as u8);
        current.push((len & 0xFF) as u8);
        current.extend_from_slice(frame.as_bytes());
    }

    if !current.is_empty() {
        datagrams.push(current);
    }

    datagrams.push(TERMINATOR.to_vec());
    datagrams
}

/// Parse the concatenation of a GET response's data datagrams (terminator
/// excluded) back into the set of `{len, bytes}` entries it encodes. Used by
/// tests and by any client that wants to reconstruct the server's view.
pub fn decode_get_response(payload: &[u8]) -> Result<Vec<GetEntry>, ProtoError> {
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        if offset + 2 > payload.len() {
            return Err(ProtoError::Truncated);
        }
        let length = ((payload[offset] as usize) << 8) | payload[offset + 1] as usize;
        offset += 2;
        if offset + length > payload.len() {
            return Err(ProtoError::ShortBody);
        }
        entries.push(GetEntry {
            frame: ContactFrame::new(payload[offset..offset + length].to_vec()),
        });
        offset += length;
    }
    Ok(entries)
}

/// The four magic bytes that mark a datagram as a HOLEPUNCH rather than user
/// data on the peer-to-peer channel.
pub const HOLEPUNCH_PREFIX: [u8; 4] = [0x11, 0x11, 0x11, 0x11];

/// Build a HOLEPUNCH datagram: the magic prefix followed by the sender's
/// nickname, with no length prefix — the reader stops at the first NUL byte
/// or end of datagram, whichever comes first.
pub fn build_holepunch(nickname: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HOLEPUNCH_PREFIX.len() + nickname.len());
    buf.extend_from_slice(&HOLEPUNCH_PREFIX);
    buf.extend_from_slice(nickname.as_bytes());
    buf
}

/// If `datagram` is a HOLEPUNCH, return the claimed nickname (the bytes
/// after the prefix, up to the first NUL or end of datagram). Returns `None`
/// for anything that isn't a HOLEPUNCH, i.e. ordinary user data.
pub fn parse_holepunch(datagram: &[u8]) -> Option<&str> {
    if datagram.len() < HOLEPUNCH_PREFIX.len() || datagram[..4] != HOLEPUNCH_PREFIX {
        return None;
    }
    let rest = &datagram[4..];
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_parses_round_trip() {
        let dgram = build_holepunch("bob");
        assert_eq!(&dgram[..4], &HOLEPUNCH_PREFIX);
        assert_eq!(parse_holepunch(&dgram), Some("bob"));
    }

    #[test]
    fn parse_stops_at_nul() {
        let mut dgram = build_holepunch("bob");
        dgram.push(0);
        dgram.extend_from_slice(b"trailing-garbage");
        assert_eq!(parse_holepunch(&dgram), Some("bob"));
    }

    #[test]
    fn non_holepunch_data_is_not_parsed() {
        let dgram = b"hello world".to_vec();
        assert_eq!(parse_holepunch(&dgram), None);
    }

    #[test]
    fn too_short_to_carry_the_prefix_is_not_a_holepunch() {
        assert_eq!(parse_holepunch(&[0x11, 0x11]), None);
    }
}

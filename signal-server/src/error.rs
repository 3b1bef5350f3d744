use thiserror::Error;

/// Fatal, process-ending errors for the signal server. Anything recoverable
/// (malformed datagrams, a failed reply send) is logged in place and does
/// not produce one of these.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

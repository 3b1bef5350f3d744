use thiserror::Error;

/// Fatal, process-ending errors for the peer agent. Bind failure and STUN
/// failure are both specified as fatal startup errors; everything
/// else that can go wrong after startup (unknown sender, duplicate
/// HOLEPUNCH, a failed send) is handled in place and never reaches here.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no STUN servers configured")]
    NoStunServers,

    #[error("failed to bind UDP socket on 0.0.0.0:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("STUN probe against {server} failed: {reason}")]
    Stun { server: String, reason: String },

    #[error("invalid address {0}")]
    InvalidAddress(String),
}

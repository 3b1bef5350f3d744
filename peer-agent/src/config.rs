use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// The configuration bundle a peer agent is constructed from: `{nickname,
/// bind_port, stun_servers[], signal_server_addr}`.
///
/// Reads environment variables with defaults, optionally overlaid by a JSON
/// file for persisting identity across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub nickname: String,
    pub bind_port: u16,
    pub stun_servers: Vec<String>,
    pub signal_server_addr: String,
}

const DEFAULT_BIND_PORT: u16 = 42100;
const DEFAULT_STUN_SERVERS: &str = "stun.l.google.com:19302";
const DEFAULT_SIGNAL_SERVER: &str = "127.0.0.1:9000";

impl PeerConfig {
    /// Load from environment variables (`RENDEZVOUS_NICKNAME`,
    /// `RENDEZVOUS_BIND_PORT`, `RENDEZVOUS_STUN_SERVERS` comma-separated,
    /// `RENDEZVOUS_SIGNAL_SERVER`), optionally overlaid by the JSON file
    /// named in `RENDEZVOUS_CONFIG_FILE`. File values win over env defaults,
    /// since the file is meant to persist an identity across restarts.
    pub fn from_env() -> Result<Self, AgentError> {
        let mut config = Self {
            nickname: std::env::var("RENDEZVOUS_NICKNAME").unwrap_or_else(|_| default_nickname()),
            bind_port: std::env::var("RENDEZVOUS_BIND_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BIND_PORT),
            stun_servers: std::env::var("RENDEZVOUS_STUN_SERVERS")
                .unwrap_or_else(|_| DEFAULT_STUN_SERVERS.to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            signal_server_addr: std::env::var("RENDEZVOUS_SIGNAL_SERVER")
                .unwrap_or_else(|_| DEFAULT_SIGNAL_SERVER.to_string()),
        };

        if let Ok(path) = std::env::var("RENDEZVOUS_CONFIG_FILE") {
            let raw = std::fs::read(&path).map_err(|source| AgentError::ConfigFile {
                path: path.clone(),
                source,
            })?;
            let overlay: PeerConfig = serde_json::from_slice(&raw)
                .map_err(|source| AgentError::ConfigParse { path, source })?;
            config = overlay;
        }

        if config.stun_servers.is_empty() {
            return Err(AgentError::NoStunServers);
        }

        Ok(config)
    }
}

fn default_nickname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "peer".to_string())
}

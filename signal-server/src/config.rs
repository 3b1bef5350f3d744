use clap::Parser;

/// `signal-server <bind_address> <port>` per the protocol's CLI contract.
#[derive(Parser, Debug)]
#[command(name = "signal-server", author, version, about = "UDP rendezvous server for peer contact frames")]
pub struct Args {
    /// Address to bind the UDP socket to (e.g. 0.0.0.0).
    pub bind_address: String,

    /// UDP port to listen on.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

//! Command line surface and the immutable configuration built from it.

use std::{fmt, net::Ipv4Addr, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::daemon::supervisor::RECONNECT_INTERVAL;

/// Which end of the tunnel this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelRole {
    Client,
    Server,
}

impl fmt::Display for TunnelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// How packets travel between the two ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    /// One datagram per packet.
    Udp,
    /// Length-prefixed frames over one connection.
    Tcp,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "udp"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Point-to-point IP tunnel over UDP or TCP
#[derive(Parser, Debug)]
#[command(name = "ptptun")]
#[command(version)]
pub struct Args {
    /// Run as server
    #[arg(short = 's', long = "server")]
    pub server: bool,

    /// Client tunnel address
    #[arg(long, default_value = "10.0.0.1")]
    pub cip: Ipv4Addr,

    /// Server tunnel address
    #[arg(long, default_value = "10.0.0.2")]
    pub sip: Ipv4Addr,

    /// Remote address (client) or listen address (server)
    #[arg(long, default_value = ":8000")]
    pub addr: String,

    /// Shared passphrase; packets are sent in the clear without one
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,

    /// File listing destinations to route through the tunnel (client only)
    #[arg(long)]
    pub iplist: Option<PathBuf>,

    /// Transport carrying the packets
    #[arg(long, value_enum, default_value_t = TransportMode::Udp)]
    pub transport: TransportMode,

    /// Log filter (trace, debug, info, warn, error or tracing directives)
    #[arg(short = 'v', long, default_value = "info")]
    pub log_level: String,
}

/// The daemon configuration. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub role: TunnelRole,
    pub transport: TransportMode,
    /// Address of this end's tunnel interface.
    pub local_ip: Ipv4Addr,
    /// Address of the other end's tunnel interface.
    pub peer_ip: Ipv4Addr,
    /// Transport address to dial (client) or listen on (server).
    pub address: String,
    pub passphrase: Option<String>,
    pub route_list: Option<PathBuf>,
    pub reconnect_interval: Duration,
}

impl TunnelConfig {
    /// The transport address in `host:port` form.
    ///
    /// A bare `:port` means every local address.
    pub fn socket_address(&self) -> String {
        match self.address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.address.clone(),
        }
    }
}

impl From<Args> for TunnelConfig {
    fn from(args: Args) -> Self {
        let (role, local_ip, peer_ip) = if args.server {
            (TunnelRole::Server, args.sip, args.cip)
        } else {
            (TunnelRole::Client, args.cip, args.sip)
        };
        Self {
            role,
            transport: args.transport,
            local_ip,
            peer_ip,
            address: args.addr,
            passphrase: args.key,
            route_list: args.iplist,
            reconnect_interval: RECONNECT_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(arguments: &[&str]) -> TunnelConfig {
        let args = Args::try_parse_from(std::iter::once("ptptun").chain(arguments.iter().copied()))
            .unwrap();
        TunnelConfig::from(args)
    }

    #[test]
    fn test_client_defaults() {
        let config = parse(&[]);
        assert_eq!(config.role, TunnelRole::Client);
        assert_eq!(config.transport, TransportMode::Udp);
        assert_eq!(config.local_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(config.peer_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.socket_address(), "0.0.0.0:8000");
        assert!(config.passphrase.is_none());
        assert!(config.route_list.is_none());
        assert_eq!(config.reconnect_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_server_swaps_tunnel_addresses() {
        let config = parse(&["-s", "--cip", "10.8.0.1", "--sip", "10.8.0.2"]);
        assert_eq!(config.role, TunnelRole::Server);
        assert_eq!(config.local_ip, Ipv4Addr::new(10, 8, 0, 2));
        assert_eq!(config.peer_ip, Ipv4Addr::new(10, 8, 0, 1));
    }

    #[test]
    fn test_client_options() {
        let config = parse(&[
            "--addr",
            "vpn.example.com:9000",
            "-k",
            "123456",
            "--iplist",
            "iplist.txt",
            "--transport",
            "tcp",
        ]);
        assert_eq!(config.socket_address(), "vpn.example.com:9000");
        assert_eq!(config.passphrase.as_deref(), Some("123456"));
        assert_eq!(config.route_list, Some(PathBuf::from("iplist.txt")));
        assert_eq!(config.transport, TransportMode::Tcp);
    }

    #[test]
    fn test_rejects_bad_tunnel_address() {
        assert!(Args::try_parse_from(["ptptun", "--cip", "10.0.0.300"]).is_err());
        assert!(Args::try_parse_from(["ptptun", "--transport", "sctp"]).is_err());
    }
}

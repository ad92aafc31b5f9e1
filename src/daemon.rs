//! The ptptun's daemon. It creates the interface, prepares the host and
//! relays packets until a fatal error or Ctrl-C.

pub mod bridge;
pub mod cipher;
pub mod error;
pub mod frame;
pub mod host;
pub mod interface;
pub mod peer;
pub mod supervisor;

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{lookup_host, TcpListener, UdpSocket},
    select,
};
use tracing::info;

use crate::config::{TransportMode, TunnelConfig, TunnelRole};

pub use error::DaemonError;

use self::{
    bridge::{DatagramPeer, InterfaceBridge},
    cipher::PacketCipher,
    host::ShellConfigurator,
    peer::PeerTracker,
    supervisor::{serve_stream, ConnectionSupervisor, TcpConnector},
};

/// The ptptun's daemon
pub async fn run_daemon(config: TunnelConfig) -> Result<(), DaemonError> {
    let (device, interface_name) = interface::create(&config)?;
    host::setup(&config, &interface_name, &ShellConfigurator)?;

    let cipher = config
        .passphrase
        .as_deref()
        .map(PacketCipher::from_passphrase)
        .transpose()?;
    if cipher.is_none() {
        info!("no passphrase set, packets travel unencrypted");
    }
    let mut bridge = InterfaceBridge::new(device, cipher);

    select! {
        result = run_transport(&config, &mut bridge) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("stopping");
            Ok(())
        }
    }
}

/// Opens the configured transport and relays over it.
pub async fn run_transport<D>(
    config: &TunnelConfig,
    bridge: &mut InterfaceBridge<D>,
) -> Result<(), DaemonError>
where
    D: AsyncRead + AsyncWrite + Send,
{
    let address = resolve(&config.socket_address()).await?;
    info!(
        "running as {} over {} ({})",
        config.role, config.transport, address
    );
    match (config.transport, config.role) {
        (TransportMode::Udp, TunnelRole::Server) => {
            let socket = UdpSocket::bind(address).await.map_err(bind_error(address))?;
            bridge
                .run_datagram(&socket, DatagramPeer::Learned(PeerTracker::unset()))
                .await
        }
        (TransportMode::Udp, TunnelRole::Client) => {
            let local = unspecified_for(address);
            let socket = UdpSocket::bind(local).await.map_err(bind_error(local))?;
            socket.connect(address).await?;
            bridge.run_datagram(&socket, DatagramPeer::Connected).await
        }
        (TransportMode::Tcp, TunnelRole::Server) => {
            let listener = TcpListener::bind(address).await.map_err(bind_error(address))?;
            serve_stream(&listener, bridge).await
        }
        (TransportMode::Tcp, TunnelRole::Client) => {
            ConnectionSupervisor::new(TcpConnector::new(address), config.reconnect_interval)
                .run(bridge)
                .await
        }
    }
}

/// Resolves `address` to its first socket address.
pub async fn resolve(address: &str) -> Result<SocketAddr, DaemonError> {
    let resolve_error = |source: io::Error| DaemonError::Resolve {
        address: address.to_string(),
        source,
    };
    lookup_host(address)
        .await
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| {
            resolve_error(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
        })
}

fn unspecified_for(remote: SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

fn bind_error(address: SocketAddr) -> impl FnOnce(std::io::Error) -> DaemonError {
    move |source| DaemonError::Bind {
        address: address.to_string(),
        source,
    }
}

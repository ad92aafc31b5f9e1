//! Session management for the stream transport.
//!
//! A client keeps a connection alive with [ConnectionSupervisor]; a server
//! serves one connection at a time with [serve_stream].

use std::{future::Future, io, net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

use super::{bridge::InterfaceBridge, error::DaemonError};

/// Delay between two connection attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// The trait responsible for opening stream connections to the peer.
pub trait Connector {
    type Connection: AsyncRead + AsyncWrite + Unpin + Send;

    /// Makes one connection attempt.
    fn connect(&self) -> impl Future<Output = io::Result<Self::Connection>> + Send;
}

/// Dials a fixed TCP address.
pub struct TcpConnector {
    remote: SocketAddr,
}

impl TcpConnector {
    pub fn new(remote: SocketAddr) -> Self {
        Self { remote }
    }
}

impl Connector for TcpConnector {
    type Connection = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        debug!("dialing {}", self.remote);
        let stream = TcpStream::connect(self.remote).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Keeps a client connected: dials until it succeeds, relays until the
/// session ends, then dials again.
pub struct ConnectionSupervisor<C> {
    connector: C,
    retry_interval: Duration,
}

impl<C: Connector> ConnectionSupervisor<C> {
    pub fn new(connector: C, retry_interval: Duration) -> Self {
        Self {
            connector,
            retry_interval,
        }
    }

    /// Runs forever. Only a fatal error from the bridge stops it.
    ///
    /// Failed attempts are retried after the same fixed interval every time.
    pub async fn run<D>(&self, bridge: &mut InterfaceBridge<D>) -> Result<(), DaemonError>
    where
        D: AsyncRead + AsyncWrite + Send,
    {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.connector.connect().await {
                Ok(connection) => {
                    info!("connected after {} attempt(s)", attempt);
                    attempt = 0;
                    bridge.run_stream(connection).await?;
                    info!("disconnected, reconnecting");
                }
                Err(error) => {
                    warn!(
                        "connection attempt {} failed: {}, retrying in {:?}",
                        attempt, error, self.retry_interval
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}

/// Accepts connections one after another and relays each of them until it
/// ends. Connections arriving meanwhile wait in the listen backlog.
///
/// Only returns on a fatal error from the bridge.
pub async fn serve_stream<D>(
    listener: &TcpListener,
    bridge: &mut InterfaceBridge<D>,
) -> Result<(), DaemonError>
where
    D: AsyncRead + AsyncWrite + Send,
{
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!("failed to accept a connection: {}", error);
                continue;
            }
        };
        if let Err(error) = stream.set_nodelay(true) {
            warn!("failed to set TCP_NODELAY for {}: {}", remote, error);
        }
        info!("accepted {}", remote);
        bridge.run_stream(stream).await?;
        info!("{} disconnected", remote);
    }
}

//! Module for [InterfaceBridge].
//!
//! It relays packets between the TUN interface and the transport, one
//! direction per future: inbound (transport to interface) and outbound
//! (interface to transport).

use std::convert::Infallible;

use tokio::{
    io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    net::UdpSocket,
    select,
};
use tracing::{debug, info, trace, warn};

use super::{
    cipher::PacketCipher,
    error::{ChannelError, DaemonError},
    frame::{read_frame, write_frame, MAX_FRAME_PAYLOAD},
    peer::PeerTracker,
};

/// Largest datagram relayed in either direction.
pub const MAX_DATAGRAM_SIZE: usize = 1600;

/// Where outgoing datagrams go.
#[derive(Debug, Clone)]
pub enum DatagramPeer {
    /// The socket is connected to the configured remote (client).
    Connected,
    /// The remote is learned from inbound datagrams (server).
    Learned(PeerTracker),
}

/// Bridges a packet interface and a transport.
///
/// The interface halves outlive single sessions, so one bridge serves every
/// connection a supervisor or accept loop hands to it.
pub struct InterfaceBridge<D> {
    /// Packets read here go out through the transport.
    interface_reader: ReadHalf<D>,

    /// Packets received from the transport are written here.
    interface_writer: WriteHalf<D>,

    /// Applied to every payload when a passphrase is configured.
    cipher: Option<PacketCipher>,
}

impl<D> InterfaceBridge<D>
where
    D: AsyncRead + AsyncWrite + Send,
{
    /// Creates a new [InterfaceBridge] over `device`.
    pub fn new(device: D, cipher: Option<PacketCipher>) -> Self {
        let (interface_reader, interface_writer) = split(device);
        Self {
            interface_reader,
            interface_writer,
            cipher,
        }
    }

    /// Relays packets over a UDP socket.
    ///
    /// With [DatagramPeer::Connected] packets go through the connected
    /// `socket`. With [DatagramPeer::Learned] they go to the address held by
    /// the tracker, which follows the sender of every inbound datagram;
    /// outgoing packets are dropped while it is still unset.
    ///
    /// Datagrams longer than [MAX_DATAGRAM_SIZE] are truncated to it.
    ///
    /// Only returns on a fatal interface error.
    pub async fn run_datagram(
        &mut self,
        socket: &UdpSocket,
        peer: DatagramPeer,
    ) -> Result<(), DaemonError> {
        let cipher = self.cipher.as_ref();
        select! {
            result = datagram_outbound(&mut self.interface_reader, socket, &peer, cipher) => result,
            never = datagram_inbound(&mut self.interface_writer, socket, &peer, cipher) => match never {},
        }
    }

    /// Relays packets over one stream connection until it fails or closes.
    ///
    /// The connection is dropped before returning. `Ok(())` means the
    /// session ended and the caller may hand in a new connection.
    pub async fn run_stream<S>(&mut self, stream: S) -> Result<(), DaemonError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut stream_reader, mut stream_writer) = split(stream);
        let cipher = self.cipher.as_ref();
        let ended = select! {
            ended = stream_outbound(&mut self.interface_reader, &mut stream_writer, cipher) => ended?,
            ended = stream_inbound(&mut self.interface_writer, &mut stream_reader, cipher) => ended,
        };
        info!("session ended: {}", ended);
        Ok(())
    }
}

async fn datagram_outbound<R>(
    interface: &mut R,
    socket: &UdpSocket,
    peer: &DatagramPeer,
    cipher: Option<&PacketCipher>,
) -> Result<(), DaemonError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let size = read_packet(interface, &mut buffer).await?;
        trace!("iface read {}", size);
        let packet = &mut buffer[..size];
        if let Some(cipher) = cipher {
            cipher.encode(packet);
        }

        let sent = match peer {
            DatagramPeer::Connected => socket.send(packet).await,
            DatagramPeer::Learned(tracker) => {
                let Some(remote) = tracker.load() else {
                    continue; // No peer has spoken yet
                };
                socket.send_to(packet, remote).await
            }
        };
        if let Err(error) = sent {
            warn!("failed to send a datagram: {}", error);
        }
    }
}

async fn datagram_inbound<W>(
    interface: &mut W,
    socket: &UdpSocket,
    peer: &DatagramPeer,
    cipher: Option<&PacketCipher>,
) -> Infallible
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (size, sender) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(error) => {
                warn!("failed to receive a datagram: {}", error);
                continue;
            }
        };
        trace!("conn read {}", size);
        if size == MAX_DATAGRAM_SIZE {
            debug!("datagram from {} may have been truncated to {} bytes", sender, size);
        }
        let packet = &mut buffer[..size];
        if let Some(cipher) = cipher {
            cipher.decode(packet);
        }

        if let DatagramPeer::Learned(tracker) = peer {
            match tracker.observe(sender) {
                Some(Some(previous)) => info!("remote changed {} -> {}", previous, sender),
                Some(None) => info!("remote is {}", sender),
                None => {}
            }
        }

        if let Err(error) = write_packet(interface, packet).await {
            warn!("failed to write to the interface: {}", error);
        }
    }
}

async fn stream_outbound<R, W>(
    interface: &mut R,
    stream: &mut W,
    cipher: Option<&PacketCipher>,
) -> Result<ChannelError, DaemonError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; MAX_FRAME_PAYLOAD];
    loop {
        let size = read_packet(interface, &mut buffer).await?;
        trace!("iface read {}", size);
        let packet = &mut buffer[..size];
        if let Some(cipher) = cipher {
            cipher.encode(packet);
        }
        if let Err(error) = write_frame(stream, packet).await {
            return Ok(error);
        }
    }
}

async fn stream_inbound<R, W>(
    interface: &mut W,
    stream: &mut R,
    cipher: Option<&PacketCipher>,
) -> ChannelError
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; MAX_FRAME_PAYLOAD];
    loop {
        let size = match read_frame(stream, &mut buffer).await {
            Ok(size) => size,
            Err(error) => return error,
        };
        trace!("conn read {}", size);
        let packet = &mut buffer[..size];
        if let Some(cipher) = cipher {
            cipher.decode(packet);
        }
        if let Err(error) = write_packet(interface, packet).await {
            warn!("failed to write to the interface: {}", error);
        }
    }
}

/// Reads one packet. Any failure here is fatal to the daemon.
async fn read_packet<R>(interface: &mut R, buffer: &mut [u8]) -> Result<usize, DaemonError>
where
    R: AsyncRead + Unpin,
{
    match interface.read(buffer).await {
        Ok(0) => Err(DaemonError::InterfaceClosed),
        Ok(size) => Ok(size),
        Err(error) => Err(DaemonError::InterfaceRead(error)),
    }
}

async fn write_packet<W>(interface: &mut W, packet: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if packet.is_empty() {
        debug!("skipping an empty packet");
        return Ok(());
    }
    interface.write_all(packet).await?;
    interface.flush().await
}

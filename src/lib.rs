//! # ptptun: point-to-point IP tunnel
//!
//! **ptptun** carries raw IP packets between a local TUN interface and one
//! remote peer, over UDP datagrams or a TCP stream.
//!
//! ## How It Works
//! 1. **Interface**: each end creates a point-to-point TUN interface (client `10.0.0.1`,
//!    server `10.0.0.2` by default).
//! 2. **Host setup**: the server enables forwarding and masquerades traffic coming out of the
//!    tunnel; the client routes the destinations listed in a file through it.
//! 3. **Relay**: packets read from the interface are sent to the peer, packets received from
//!    the peer are written to the interface. Over UDP one datagram is one packet; over TCP
//!    every packet is prefixed with its 16-bit big-endian length.
//! 4. **Peer discovery**: a UDP server learns where to send from the last datagram it
//!    received. A TCP client reconnects every second after losing its connection.
//!
//! With a shared passphrase, payloads are RC4-transformed with the passphrase's MD5 digest.
//!
//! ## Warning
//!
//! There is no handshake, no authentication and no integrity protection. The keystream
//! restarts for every packet, so the cipher only hides payloads from casual inspection.

pub mod config;
pub mod daemon;

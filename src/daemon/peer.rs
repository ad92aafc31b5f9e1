//! Module for [PeerTracker].
//!
//! It holds the remote address datagrams are sent to.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

/// Shared slot holding the current remote address of a datagram session.
///
/// Clones share the same slot. The inbound direction is the only writer.
#[derive(Debug, Clone, Default)]
pub struct PeerTracker {
    remote: Arc<Mutex<Option<SocketAddr>>>,
}

impl PeerTracker {
    /// A tracker with no peer yet, used by a server awaiting its first packet.
    pub fn unset() -> Self {
        Self::default()
    }

    /// A tracker preloaded with the configured remote, used by a client.
    pub fn fixed(remote: SocketAddr) -> Self {
        Self {
            remote: Arc::new(Mutex::new(Some(remote))),
        }
    }

    /// Replaces the current address.
    pub fn store(&self, remote: SocketAddr) {
        *self.remote.lock().unwrap_or_else(PoisonError::into_inner) = Some(remote);
    }

    /// Returns the most recently stored address, if any.
    pub fn load(&self) -> Option<SocketAddr> {
        *self.remote.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `remote` if it differs from the current address.
    ///
    /// Returns the previous value when a change happened, `None` otherwise.
    pub fn observe(&self, remote: SocketAddr) -> Option<Option<SocketAddr>> {
        let mut current = self.remote.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == Some(remote) {
            return None;
        }
        Some(current.replace(remote))
    }
}

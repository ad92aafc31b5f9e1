use std::io;

use thiserror::Error;

use super::cipher::CipherError;

/// Errors that end the ptptun daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("tun device error: {0}")]
    TunError(#[from] tun::Error),
    #[error("failed to read from the tun interface: {0}")]
    InterfaceRead(io::Error),
    #[error("the tun interface was closed")]
    InterfaceClosed,
    #[error(transparent)]
    CipherError(#[from] CipherError),
    #[error("could not resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("`{command}` failed: {output}")]
    HostCommand { command: String, output: String },
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// Errors that end a single stream session but not the daemon.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed")]
    Closed,
    #[error("frame length {0} exceeds the maximum payload size")]
    FrameTooLarge(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

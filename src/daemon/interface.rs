//! Module for the TUN interface.

use tracing::info;
use tun::{AsyncDevice, Device as _};

use crate::config::TunnelConfig;

use super::error::DaemonError;

/// Creates the point-to-point TUN interface and brings it up.
///
/// Returns the device together with the name the OS gave it.
pub fn create(config: &TunnelConfig) -> Result<(AsyncDevice, String), DaemonError> {
    let mut configuration = tun::configure();
    configuration
        .address(config.local_ip)
        .destination(config.peer_ip)
        .netmask((255, 255, 255, 255))
        .up();

    #[cfg(target_os = "linux")]
    configuration.platform(|platform| {
        platform.packet_information(false);
    });

    let device = tun::create_as_async(&configuration)?;
    let name = device.get_ref().name()?;
    info!(
        "interface {} is up: {} -> {}",
        name, config.local_ip, config.peer_ip
    );
    Ok((device, name))
}

//! Host network setup done once before relaying starts: NAT on the server,
//! static routes on the client.

use std::{fs, net::Ipv4Addr, path::Path, process::Command};

use tracing::{debug, info};

use crate::config::{TunnelConfig, TunnelRole};

use super::error::DaemonError;

/// Packets entering the tunnel interface carry this firewall mark.
pub const NAT_MARK: &str = "12321";

#[cfg(target_os = "linux")]
const MARK_CHAIN: &str = "PTPTUN-MARK";
#[cfg(target_os = "linux")]
const NAT_CHAIN: &str = "PTPTUN-NAT";

/// Changes to the host's network configuration.
pub trait HostConfigurator {
    /// Lets hosts behind the tunnel reach the server's networks.
    fn install_nat(&self, interface: &str, local_ip: Ipv4Addr) -> Result<(), DaemonError>;

    /// Routes `network` through `interface`.
    fn add_route(&self, interface: &str, network: &str) -> Result<(), DaemonError>;
}

/// Applies the configuration with the platform's command line tools.
pub struct ShellConfigurator;

impl HostConfigurator for ShellConfigurator {
    #[cfg(target_os = "linux")]
    fn install_nat(&self, interface: &str, local_ip: Ipv4Addr) -> Result<(), DaemonError> {
        fs::write("/proc/sys/net/ipv4/ip_forward", "1")?;

        for chain in [MARK_CHAIN, NAT_CHAIN] {
            // Errors when the chain already exists.
            let _ = run("iptables", &["-t", "nat", "-N", chain]);
            run("iptables", &["-t", "nat", "-F", chain])?;
        }

        let local_ip = local_ip.to_string();
        let rules: [(&str, Vec<&str>); 4] = [
            (
                MARK_CHAIN,
                vec!["-i", interface, "-j", "MARK", "--set-mark", NAT_MARK],
            ),
            (
                NAT_CHAIN,
                vec![
                    "-m", "mark", "--mark", NAT_MARK, "!", "-d", local_ip.as_str(), "-j", "MASQUERADE",
                ],
            ),
            ("PREROUTING", vec!["-j", MARK_CHAIN]),
            ("POSTROUTING", vec!["-j", NAT_CHAIN]),
        ];
        for (chain, rule) in &rules {
            append_unique(chain, rule)?;
        }
        info!("NAT installed for {}", interface);
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn install_nat(&self, interface: &str, _local_ip: Ipv4Addr) -> Result<(), DaemonError> {
        info!("NAT is only supported on Linux, skipping it for {}", interface);
        Ok(())
    }

    fn add_route(&self, interface: &str, network: &str) -> Result<(), DaemonError> {
        if cfg!(target_os = "macos") {
            run("route", &["add", "-net", network, "-interface", interface])
        } else {
            run("ip", &["route", "replace", network, "dev", interface])
        }
    }
}

#[cfg(target_os = "linux")]
fn append_unique(chain: &str, rule: &[&str]) -> Result<(), DaemonError> {
    let mut check = vec!["-t", "nat", "-C", chain];
    check.extend_from_slice(rule);
    if run("iptables", &check).is_ok() {
        return Ok(());
    }
    let mut append = vec!["-t", "nat", "-A", chain];
    append.extend_from_slice(rule);
    run("iptables", &append)
}

fn run(program: &str, arguments: &[&str]) -> Result<(), DaemonError> {
    let command = format!("{} {}", program, arguments.join(" "));
    debug!("{}", command);
    let output = Command::new(program).args(arguments).output()?;
    if output.status.success() {
        return Ok(());
    }
    let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if message.is_empty() {
        message = output.status.to_string();
    }
    Err(DaemonError::HostCommand {
        command,
        output: message,
    })
}

/// Parses a route list: one destination per line, blank lines and `#`
/// comments ignored.
pub fn parse_route_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_route_list(path: &Path) -> Result<Vec<String>, DaemonError> {
    Ok(parse_route_list(&fs::read_to_string(path)?))
}

/// Prepares the host for `config`: NAT on a server, routes on a client.
pub fn setup<H>(config: &TunnelConfig, interface: &str, host: &H) -> Result<(), DaemonError>
where
    H: HostConfigurator + ?Sized,
{
    match config.role {
        TunnelRole::Server => host.install_nat(interface, config.local_ip),
        TunnelRole::Client => {
            let Some(path) = &config.route_list else {
                return Ok(());
            };
            let routes = read_route_list(path)?;
            for network in &routes {
                host.add_route(interface, network)?;
            }
            info!("{} route(s) added through {}", routes.len(), interface);
            Ok(())
        }
    }
}

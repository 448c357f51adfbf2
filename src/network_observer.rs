// Active network identity via NetworkManager D-Bus

//! Active network identification
//!
//! Resolves the identity of the currently active network: the SSID when
//! the primary connection is wireless, otherwise the device interface
//! name. When NetworkManager is not reachable over D-Bus the routing
//! table is consulted instead. An empty identity means there is no
//! default route at all.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::process::Command;
use zbus::{proxy, Connection};

/// Reports the identity of the currently active network
#[allow(async_fn_in_trait)]
pub trait NetworkObserver {
    /// Current network identity; empty string when no default route exists
    async fn current(&self) -> Result<String>;
}

/// D-Bus proxy for NetworkManager
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
trait NetworkManager {
    /// Get the primary connection object path
    #[zbus(property)]
    fn primary_connection(&self) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

/// D-Bus proxy for active connection
#[proxy(
    interface = "org.freedesktop.NetworkManager.Connection.Active",
    default_service = "org.freedesktop.NetworkManager"
)]
trait ActiveConnection {
    /// Get the connection type
    #[zbus(property, name = "Type")]
    fn connection_type(&self) -> zbus::Result<String>;

    /// Get the devices associated with this connection
    #[zbus(property)]
    fn devices(&self) -> zbus::Result<Vec<zbus::zvariant::OwnedObjectPath>>;
}

/// D-Bus proxy for a network device
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
trait Device {
    /// Get the device's interface name
    #[zbus(property)]
    fn interface(&self) -> zbus::Result<String>;
}

/// D-Bus proxy for wireless device
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Wireless",
    default_service = "org.freedesktop.NetworkManager"
)]
trait WirelessDevice {
    /// Get the active access point object path
    #[zbus(property)]
    fn active_access_point(&self) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

/// D-Bus proxy for access point
#[proxy(
    interface = "org.freedesktop.NetworkManager.AccessPoint",
    default_service = "org.freedesktop.NetworkManager"
)]
trait AccessPoint {
    /// Get the SSID as raw bytes
    #[zbus(property)]
    fn ssid(&self) -> zbus::Result<Vec<u8>>;
}

/// Observer querying NetworkManager, with a routing-table fallback
pub struct SystemNetworkObserver {
    command_timeout: Duration,
}

impl SystemNetworkObserver {
    /// Create an observer; `command_timeout` bounds the routing-table
    /// fallback command
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// Identity of the primary connection per NetworkManager:
    /// SSID for wireless, interface name otherwise, "" when none
    async fn identity_via_networkmanager(&self) -> Result<String> {
        let connection = Connection::system()
            .await
            .context("Failed to connect to system D-Bus")?;

        let nm = NetworkManagerProxy::new(&connection)
            .await
            .context("Failed to create NetworkManager proxy")?;

        let primary = nm.primary_connection().await?;
        if primary.as_str() == "/" {
            return Ok(String::new());
        }

        let active_conn = ActiveConnectionProxy::builder(&connection)
            .path(&primary)?
            .build()
            .await?;

        let devices = active_conn.devices().await?;
        let interface = match devices.first() {
            Some(device_path) => {
                let device = DeviceProxy::builder(&connection)
                    .path(device_path)?
                    .build()
                    .await?;
                device.interface().await?
            }
            None => return Ok(String::new()),
        };

        if active_conn.connection_type().await? != "802-11-wireless" {
            return Ok(interface);
        }

        // Wireless: prefer the SSID, fall back to the interface name when
        // not associated or the SSID is not valid UTF-8
        let wireless = WirelessDeviceProxy::builder(&connection)
            .path(&devices[0])?
            .build()
            .await?;

        let ap_path = wireless.active_access_point().await?;
        if ap_path.as_str() == "/" {
            return Ok(interface);
        }

        let ap = AccessPointProxy::builder(&connection)
            .path(&ap_path)?
            .build()
            .await?;

        match String::from_utf8(ap.ssid().await?) {
            Ok(ssid) if !ssid.is_empty() => Ok(ssid),
            _ => Ok(interface),
        }
    }

    /// Default-route interface name from `ip route show default`,
    /// "" when there is no default route
    async fn default_route_interface(&self) -> Result<String> {
        let output = tokio::time::timeout(
            self.command_timeout,
            Command::new("ip").args(["route", "show", "default"]).output(),
        )
        .await
        .context("'ip route show default' timed out")?
        .context("Failed to execute 'ip route show default'")?;

        if !output.status.success() {
            anyhow::bail!("'ip route show default' exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_default_route(&stdout).unwrap_or_default())
    }
}

impl NetworkObserver for SystemNetworkObserver {
    async fn current(&self) -> Result<String> {
        match self.identity_via_networkmanager().await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                log::debug!(
                    "NetworkManager query failed ({:#}), falling back to routing table",
                    e
                );
                self.default_route_interface().await
            }
        }
    }
}

/// Parse output like "default via 192.168.1.1 dev eth0 proto dhcp metric 100"
fn parse_default_route(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        if let Some(dev_pos) = line.find(" dev ") {
            let after_dev = &line[dev_pos + 5..];
            if let Some(iface) = after_dev.split_whitespace().next() {
                return Some(iface.to_string());
            }
        }
    }
    None
}

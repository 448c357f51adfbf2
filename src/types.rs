// Shared types between the reconciliation engine and its collaborators

//! Shared data structures
//!
//! This module defines the VPN status and decision types used by the
//! reconciliation engine, plus the configuration structures loaded from
//! the TOML config file.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// VPN tunnel status as reported by the VPN client CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnStatus {
    /// Tunnel is down
    Disconnected,
    /// Tunnel is up
    Connected,
    /// Tunnel is coming up
    Connecting,
    /// Unparseable or missing reply from the client
    Error,
}

impl VpnStatus {
    /// Parse the client's textual status reply.
    ///
    /// Only the exact strings "Disconnected", "Connected" and "Connecting"
    /// are recognized; anything else maps to `Error`.
    pub fn parse(reply: &str) -> Self {
        match reply.trim() {
            "Disconnected" => VpnStatus::Disconnected,
            "Connected" => VpnStatus::Connected,
            "Connecting" => VpnStatus::Connecting,
            _ => VpnStatus::Error,
        }
    }

    /// Integer code used in the persisted status record
    pub fn code(self) -> i32 {
        match self {
            VpnStatus::Disconnected => 0,
            VpnStatus::Connected => 1,
            VpnStatus::Connecting => 2,
            VpnStatus::Error => -1,
        }
    }

    /// Decode a persisted status code. Unknown codes load as `Error`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => VpnStatus::Disconnected,
            1 => VpnStatus::Connected,
            2 => VpnStatus::Connecting,
            _ => VpnStatus::Error,
        }
    }

    /// True when the tunnel is up or coming up
    pub fn is_up(self) -> bool {
        matches!(self, VpnStatus::Connected | VpnStatus::Connecting)
    }
}

impl fmt::Display for VpnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VpnStatus::Disconnected => "disconnected",
            VpnStatus::Connected => "connected",
            VpnStatus::Connecting => "connecting",
            VpnStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of the decision step of one reconciliation pass.
///
/// A single variant per action keeps connect and disconnect mutually
/// exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Bring the tunnel up
    Connect,
    /// Bring the tunnel down
    Disconnect,
    /// Leave the tunnel alone
    Nothing,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// General options
    #[serde(default)]
    pub general: GeneralConfig,
}

/// General configuration options
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address pinged to test internet reachability
    pub probe_address: String,
    /// Path to the ping binary
    pub ping_path: PathBuf,
    /// Path to the VPN client CLI (piactl-compatible)
    pub vpn_cli: PathBuf,
    /// Seconds the tunnel may stay down on an untrusted network before a
    /// reconnect is forced
    pub reset_timeout_secs: u64,
    /// Hard bound on every external command, in seconds
    pub command_timeout_secs: u64,
    /// Override for the state/journal directory
    pub data_dir: Option<PathBuf>,
    /// Diagnostic logger filter
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            probe_address: default_probe_address(),
            ping_path: PathBuf::from("ping"),
            vpn_cli: PathBuf::from("piactl"),
            reset_timeout_secs: default_reset_timeout(),
            command_timeout_secs: default_command_timeout(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Reset timer as a `Duration`
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }

    /// External command bound as a `Duration`
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// Default values for configuration
fn default_probe_address() -> String {
    "8.8.8.8".to_string() // Google DNS
}

fn default_reset_timeout() -> u64 {
    8 * 60 * 60 // 8 hours
}

fn default_command_timeout() -> u64 {
    5
}

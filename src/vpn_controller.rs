// VPN client CLI controller

//! VPN tunnel control via the client's command-line interface
//!
//! Drives a piactl-compatible binary: `get connectionstate` for status,
//! `connect` and `disconnect` for commands. Status replies are matched
//! against the exact strings the client prints; anything unexpected,
//! including a failed or timed-out invocation, reads as `Error` so the
//! engine can decide what that means for the branch it is in.

use crate::types::VpnStatus;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Reports tunnel status and accepts connect/disconnect commands
#[allow(async_fn_in_trait)]
pub trait VpnController {
    /// Current tunnel status; never fails, unreadable states are `Error`
    async fn status(&self) -> VpnStatus;
    /// Ask the client to bring the tunnel up
    async fn connect(&self) -> Result<()>;
    /// Ask the client to bring the tunnel down
    async fn disconnect(&self) -> Result<()>;
}

/// Controller backed by the VPN client CLI binary
pub struct CliVpnController {
    binary: PathBuf,
    timeout: Duration,
}

impl CliVpnController {
    /// Create a controller driving `binary`, with every invocation
    /// bounded by `timeout`
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary).args(args).output(),
        )
        .await
        .with_context(|| format!("{} {} timed out", self.binary.display(), args.join(" ")))?
        .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        Ok(output)
    }
}

impl VpnController for CliVpnController {
    async fn status(&self) -> VpnStatus {
        let output = match self.run(&["get", "connectionstate"]).await {
            Ok(output) => output,
            Err(e) => {
                log::warn!("VPN status query failed: {:#}", e);
                return VpnStatus::Error;
            }
        };

        if !output.status.success() {
            log::warn!(
                "VPN status query exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return VpnStatus::Error;
        }

        VpnStatus::parse(&String::from_utf8_lossy(&output.stdout))
    }

    async fn connect(&self) -> Result<()> {
        let output = self.run(&["connect"]).await?;
        if !output.status.success() {
            anyhow::bail!(
                "connect failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let output = self.run(&["disconnect"]).await?;
        if !output.status.success() {
            anyhow::bail!(
                "disconnect failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

// Internet reachability probe

//! Internet reachability probing
//!
//! A single ICMP echo decides whether the current network actually
//! reaches the internet. The ping binary's exit status is the verdict;
//! a spawn failure or timeout counts as unreachable.

use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Reports whether the active network currently has working internet
/// reachability
#[allow(async_fn_in_trait)]
pub trait ConnectivityProbe {
    /// True iff a probe of the fixed address succeeds
    async fn check(&self) -> bool;
}

/// Probe backed by the system ping binary
pub struct PingProbe {
    ping_path: PathBuf,
    address: String,
    timeout: Duration,
}

impl PingProbe {
    /// Create a probe pinging `address` once per check
    pub fn new(ping_path: PathBuf, address: String, timeout: Duration) -> Self {
        Self {
            ping_path,
            address,
            timeout,
        }
    }
}

impl ConnectivityProbe for PingProbe {
    async fn check(&self) -> bool {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.ping_path)
                .args(["-c", "1", &self.address])
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => output.status.success(),
            Ok(Err(e)) => {
                log::warn!("Failed to run {}: {}", self.ping_path.display(), e);
                false
            }
            Err(_) => {
                log::warn!("Ping of {} timed out", self.address);
                false
            }
        }
    }
}

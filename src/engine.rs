// Reconciliation decision core

//! The reconciliation engine
//!
//! One invocation reads the active network identity, the tunnel status,
//! the trust list and the persisted state, decides whether the tunnel
//! should be connected or disconnected, issues at most one VPN command
//! and persists what the next invocation needs for its comparison.
//!
//! Persisted status is always the value observed *before* the command
//! issued in the same pass. The next invocation compares against that
//! baseline, so a command that took effect shows up as a status edge and
//! gets journaled exactly once.

use crate::journal::Journal;
use crate::network_observer::NetworkObserver;
use crate::probe::ConnectivityProbe;
use crate::state_store::{PersistedState, StateStore};
use crate::trust_store::TrustStore;
use crate::types::{Decision, VpnStatus};
use crate::vpn_controller::VpnController;
use std::collections::HashSet;
use std::time::{Duration, SystemTime};

/// Result of one reconciliation pass, mapped to the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion, including the no-op case
    Completed,
    /// VPN status was unreadable while no network was active
    ControllerError,
}

/// One-shot reconciliation engine over the external collaborators
pub struct Engine<O, P, C> {
    observer: O,
    probe: P,
    controller: C,
    state: StateStore,
    trust: TrustStore,
    reset_timeout: Duration,
}

impl<O, P, C> Engine<O, P, C>
where
    O: NetworkObserver,
    P: ConnectivityProbe,
    C: VpnController,
{
    /// Wire up an engine over its collaborators
    pub fn new(
        observer: O,
        probe: P,
        controller: C,
        state: StateStore,
        trust: TrustStore,
        reset_timeout: Duration,
    ) -> Self {
        Self {
            observer,
            probe,
            controller,
            state,
            trust,
            reset_timeout,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// All collaborator failures are absorbed: an unreadable observer
    /// counts as no network, unreadable stores as their defaults, and a
    /// failed persistence is logged without rolling back the VPN command
    /// already issued. Only an unreadable VPN status with no active
    /// network aborts the pass with `Outcome::ControllerError`.
    pub async fn reconcile(&self, journal: &mut Journal) -> Outcome {
        let current = match self.observer.current().await {
            Ok(identity) => identity,
            Err(e) => {
                log::warn!("Network observer failed, assuming no network: {:#}", e);
                String::new()
            }
        };

        let vpn_status = self.controller.status().await;

        let trust = match self.trust.load() {
            Ok(trust) => trust,
            Err(e) => {
                log::warn!("Trust list unreadable, treating all networks as untrusted: {:#}", e);
                HashSet::new()
            }
        };

        let state = match self.state.load() {
            Ok(state) => state,
            Err(e) => {
                log::warn!("State unreadable, using defaults: {:#}", e);
                Default::default()
            }
        };

        log::debug!(
            "Reconciling: network '{}' (was '{}'), VPN {} (was {})",
            current,
            state.last_network,
            vpn_status,
            state.last_vpn_status
        );

        if current == state.last_network {
            self.reconcile_unchanged(journal, &current, vpn_status, &state, &trust)
                .await
        } else {
            self.reconcile_changed(journal, &current, vpn_status, &state, &trust)
                .await
        }
    }

    /// Network identity matches the previous invocation: watch for a
    /// status edge, and force a reconnect once the tunnel has been down
    /// on an untrusted network for longer than the reset timer.
    async fn reconcile_unchanged(
        &self,
        journal: &mut Journal,
        current: &str,
        vpn_status: VpnStatus,
        state: &PersistedState,
        trust: &HashSet<String>,
    ) -> Outcome {
        // Repeated no-network observations stay silent
        if current.is_empty() {
            return Outcome::Completed;
        }

        if vpn_status == state.last_vpn_status {
            let trusted = trust.contains(current);
            if !trusted && vpn_status == VpnStatus::Disconnected {
                let elapsed = SystemTime::now()
                    .duration_since(state.last_change)
                    .unwrap_or_default();
                if elapsed >= self.reset_timeout {
                    journal.record(format!(
                        "VPN down on untrusted network {} for {}s, forcing reconnect",
                        current,
                        elapsed.as_secs()
                    ));
                    self.issue_connect().await;
                    self.persist_vpn_status(vpn_status);
                    self.flush(journal);
                    return Outcome::Completed;
                }
            }
            return Outcome::Completed;
        }

        // Status edge: persist the new baseline and journal it
        self.persist_vpn_status(vpn_status);
        match vpn_status {
            VpnStatus::Disconnected | VpnStatus::Connected | VpnStatus::Connecting => {
                journal.record(format!("VPN is now {}", vpn_status));
            }
            VpnStatus::Error => {
                journal.record("VPN status is unreadable");
            }
        }
        self.flush(journal);
        Outcome::Completed
    }

    /// Network identity changed: decide the tunnel's posture for the new
    /// network and act on it.
    async fn reconcile_changed(
        &self,
        journal: &mut Journal,
        current: &str,
        vpn_status: VpnStatus,
        state: &PersistedState,
        trust: &HashSet<String>,
    ) -> Outcome {
        journal.record(format!(
            "network changed from {} to {}",
            display_identity(&state.last_network),
            display_identity(current)
        ));

        let decision = if current.is_empty() {
            // No default route: nothing to protect
            match vpn_status {
                VpnStatus::Connected | VpnStatus::Connecting => Decision::Disconnect,
                VpnStatus::Disconnected => Decision::Nothing,
                VpnStatus::Error => {
                    self.persist_network(current);
                    journal.record("VPN status is unreadable with no active network, giving up");
                    self.flush(journal);
                    return Outcome::ControllerError;
                }
            }
        } else if self.probe.check().await {
            if trust.contains(current) {
                journal.record(format!("{} is trusted, VPN not required", current));
                Decision::Disconnect
            } else {
                // Default posture: protect
                Decision::Connect
            }
        } else {
            journal.record(format!("no internet reachability on {}", current));
            Decision::Disconnect
        };

        self.persist_network(current);
        self.flush(journal);

        match (decision, vpn_status) {
            (Decision::Disconnect, VpnStatus::Connected | VpnStatus::Connecting) => {
                journal.record("disconnecting VPN");
                self.issue_disconnect().await;
                self.persist_vpn_status(vpn_status);
            }
            (Decision::Connect, VpnStatus::Disconnected) => {
                journal.record("connecting VPN");
                self.issue_connect().await;
                self.persist_vpn_status(vpn_status);
            }
            // Already in the wanted state, or the status is unreadable
            (Decision::Disconnect, VpnStatus::Disconnected | VpnStatus::Error) => {}
            (Decision::Connect, VpnStatus::Connected | VpnStatus::Connecting | VpnStatus::Error) => {}
            (Decision::Nothing, _) => {}
        }

        self.flush(journal);
        Outcome::Completed
    }

    async fn issue_connect(&self) {
        if let Err(e) = self.controller.connect().await {
            log::warn!("VPN connect command failed: {:#}", e);
        }
    }

    async fn issue_disconnect(&self) {
        if let Err(e) = self.controller.disconnect().await {
            log::warn!("VPN disconnect command failed: {:#}", e);
        }
    }

    fn persist_network(&self, id: &str) {
        if let Err(e) = self.state.write_network(id) {
            log::warn!("Failed to persist network record: {:#}", e);
        }
    }

    fn persist_vpn_status(&self, status: VpnStatus) {
        if let Err(e) = self.state.write_vpn_status(status) {
            log::warn!("Failed to persist VPN status record: {:#}", e);
        }
    }

    fn flush(&self, journal: &mut Journal) {
        if let Err(e) = journal.flush() {
            log::warn!("Failed to flush journal: {:#}", e);
        }
    }
}

fn display_identity(id: &str) -> &str {
    if id.is_empty() {
        "none"
    } else {
        id
    }
}

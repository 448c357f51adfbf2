// Persisted reconciliation state

//! Persisted per-field records backing the reconciliation state
//!
//! Each field lives in its own record file under the data directory. A
//! record is always an ordered sequence of lines; a scalar is the first
//! line and an empty record means the default. Writes go through a
//! temp-file rename so a record is never observed half-written.

use crate::types::VpnStatus;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const NETWORK_RECORD: &str = "last_network";
const VPN_STATUS_RECORD: &str = "vpn_status";

/// State carried between reconciliation invocations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    /// Network identity observed by the previous invocation ("" = none)
    pub last_network: String,
    /// VPN status persisted by the previous invocation
    pub last_vpn_status: VpnStatus,
    /// When the VPN status record was last written
    pub last_change: SystemTime,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            last_network: String::new(),
            last_vpn_status: VpnStatus::Disconnected,
            last_change: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Filesystem-backed store for `PersistedState`
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `dir`; nothing is touched until first use
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Load the persisted state, creating empty records on first read so
    /// subsequent reads are well-defined. Absent records load as defaults.
    pub fn load(&self) -> Result<PersistedState> {
        fs::create_dir_all(&self.dir).context("Failed to create state directory")?;

        let network_path = self.dir.join(NETWORK_RECORD);
        let status_path = self.dir.join(VPN_STATUS_RECORD);

        let mut state = PersistedState::default();

        let network_lines = read_record(&network_path)?;
        if let Some(line) = network_lines.first() {
            state.last_network = line.clone();
        }

        let status_existed = status_path.exists();
        let status_lines = read_record(&status_path)?;
        if let Some(line) = status_lines.first() {
            let code = line.parse::<i32>().unwrap_or(-1);
            state.last_vpn_status = VpnStatus::from_code(code);
        }
        if status_existed {
            state.last_change = fs::metadata(&status_path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
        }

        Ok(state)
    }

    /// Overwrite the last-network record
    pub fn write_network(&self, id: &str) -> Result<()> {
        let lines = if id.is_empty() {
            Vec::new()
        } else {
            vec![id.to_string()]
        };
        write_record(&self.dir.join(NETWORK_RECORD), &lines)
    }

    /// Overwrite the VPN status record, refreshing its timestamp.
    ///
    /// The engine always passes the status observed *before* any command
    /// issued in the same pass; the stored value is the baseline the next
    /// invocation compares against, not the intended new state.
    pub fn write_vpn_status(&self, status: VpnStatus) -> Result<()> {
        let lines = vec![status.code().to_string()];
        write_record(&self.dir.join(VPN_STATUS_RECORD), &lines)
    }
}

/// Read a record as its ordered sequence of lines, creating an empty
/// record if none exists
fn read_record(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        write_record(path, &[])?;
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record {}", path.display()))?;

    Ok(contents
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Replace a record atomically via temp-file rename
fn write_record(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
    }

    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write record {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace record {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[test]
    fn test_first_load_returns_defaults() {
        let (_dir, store) = store();
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "");
        assert_eq!(state.last_vpn_status, VpnStatus::Disconnected);
        assert_eq!(state.last_change, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_first_load_creates_records() {
        let (_dir, store) = store();
        store.load().unwrap();
        assert!(store.dir.join(NETWORK_RECORD).exists());
        assert!(store.dir.join(VPN_STATUS_RECORD).exists());

        // Second load still sees defaults for the empty records
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "");
        assert_eq!(state.last_vpn_status, VpnStatus::Disconnected);
    }

    #[test]
    fn test_network_round_trip() {
        let (_dir, store) = store();
        store.write_network("cafe-wifi").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "cafe-wifi");

        store.write_network("").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "");
    }

    #[test]
    fn test_vpn_status_round_trip() {
        let (_dir, store) = store();
        for status in [
            VpnStatus::Disconnected,
            VpnStatus::Connected,
            VpnStatus::Connecting,
            VpnStatus::Error,
        ] {
            store.write_vpn_status(status).unwrap();
            let state = store.load().unwrap();
            assert_eq!(state.last_vpn_status, status);
        }
    }

    #[test]
    fn test_status_write_refreshes_timestamp() {
        let (_dir, store) = store();
        let before = SystemTime::now();
        store.write_vpn_status(VpnStatus::Disconnected).unwrap();
        let state = store.load().unwrap();
        assert!(state.last_change >= before);
        assert!(state.last_change <= SystemTime::now());
    }

    #[test]
    fn test_garbage_status_record_loads_as_error() {
        let (_dir, store) = store();
        store.load().unwrap();
        fs::write(store.dir.join(VPN_STATUS_RECORD), "banana\n").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.last_vpn_status, VpnStatus::Error);
    }

    #[test]
    fn test_multi_line_record_scalar_is_first_line() {
        let (_dir, store) = store();
        store.load().unwrap();
        fs::write(store.dir.join(NETWORK_RECORD), "eth0\nwlan0\n").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "eth0");
    }

    #[test]
    fn test_record_without_trailing_newline() {
        let (_dir, store) = store();
        store.load().unwrap();
        fs::write(store.dir.join(NETWORK_RECORD), "home-wifi").unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.last_network, "home-wifi");
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let (_dir, store) = store();
        store.write_network("eth0").unwrap();
        let leftovers: Vec<_> = fs::read_dir(&store.dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

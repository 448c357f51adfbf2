// Trusted network list

//! Persisted set of trusted network identities
//!
//! Networks on this list need no VPN protection. The list is a plain
//! newline-delimited file, edited by hand; it is re-read on every
//! invocation so edits take effect without restarting anything.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Filesystem-backed trusted network list
pub struct TrustStore {
    path: PathBuf,
}

impl TrustStore {
    /// Create a store reading from `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the trusted set. An absent file is an empty set; blank lines
    /// are ignored. Membership is exact string equality.
    pub fn load(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read trust list {}", self.path.display()))?;

        Ok(contents
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

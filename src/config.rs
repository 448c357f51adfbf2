// Configuration file parser

//! Configuration file parsing and validation
//!
//! This module handles loading the TOML configuration file, validating its
//! contents, and resolving the default config/data directory locations.

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "vpn-autopilot";

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    base_dir().join("config.toml")
}

/// Directory holding the persisted records and the journal, unless
/// overridden by `data_dir` in the config
pub fn data_dir(config: &Config) -> PathBuf {
    match &config.general.data_dir {
        Some(dir) => dir.clone(),
        None => base_dir(),
    }
}

fn base_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Load configuration from a TOML file.
///
/// A missing file at the default path yields built-in defaults; an
/// explicitly requested path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                read_config(&path)?
            } else {
                Config::default()
            }
        }
    };

    validate_config(&config)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents).context("Failed to parse config file")
}

/// Validate configuration values
fn validate_config(config: &Config) -> Result<()> {
    let general = &config.general;

    // Must be a literal address, not a hostname: the value is passed
    // straight to the ping binary
    general
        .probe_address
        .parse::<IpAddr>()
        .with_context(|| format!("probe_address is not an IP address: {}", general.probe_address))?;

    if general.ping_path.as_os_str().is_empty() {
        anyhow::bail!("ping_path cannot be empty");
    }

    if general.vpn_cli.as_os_str().is_empty() {
        anyhow::bail!("vpn_cli cannot be empty");
    }

    if general.reset_timeout_secs == 0 {
        anyhow::bail!("reset_timeout_secs must be > 0");
    }

    if general.command_timeout_secs == 0 {
        anyhow::bail!("command_timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
            [general]
            probe_address = "1.1.1.1"
            ping_path = "/sbin/ping"
            vpn_cli = "/usr/local/bin/piactl"
            reset_timeout_secs = 3600
            command_timeout_secs = 10
            data_dir = "/var/lib/vpn-autopilot"
            log_level = "debug"
            "#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.general.probe_address, "1.1.1.1");
        assert_eq!(config.general.ping_path, PathBuf::from("/sbin/ping"));
        assert_eq!(config.general.reset_timeout_secs, 3600);
        assert_eq!(config.general.command_timeout_secs, 10);
        assert_eq!(
            data_dir(&config),
            PathBuf::from("/var/lib/vpn-autopilot")
        );
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let file = write_config(
            r#"
            [general]
            vpn_cli = "/opt/pia/piactl"
            "#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.general.vpn_cli, PathBuf::from("/opt/pia/piactl"));
        assert_eq!(config.general.probe_address, "8.8.8.8");
        assert_eq!(config.general.reset_timeout_secs, 28800);
    }

    #[test]
    fn test_load_empty_config_is_all_defaults() {
        let file = write_config("");
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.general.probe_address, "8.8.8.8");
        assert_eq!(config.general.vpn_cli, PathBuf::from("piactl"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }

    #[test]
    fn test_invalid_probe_address() {
        let file = write_config(
            r#"
            [general]
            probe_address = "dns.google"
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());

        let file = write_config(
            r#"
            [general]
            probe_address = "8.8.8"
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_ipv6_probe_address_allowed() {
        let file = write_config(
            r#"
            [general]
            probe_address = "2001:4860:4860::8888"
            "#,
        );
        assert!(load_config(Some(file.path())).is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let file = write_config(
            r#"
            [general]
            reset_timeout_secs = 0
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());

        let file = write_config(
            r#"
            [general]
            command_timeout_secs = 0
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_empty_binary_paths_rejected() {
        let file = write_config(
            r#"
            [general]
            vpn_cli = ""
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());

        let file = write_config(
            r#"
            [general]
            ping_path = ""
            "#,
        );
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let file = write_config("[general\nprobe_address = ");
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_data_dir_defaults_under_config_dir() {
        let config = Config::default();
        let dir = data_dir(&config);
        assert!(dir.ends_with(APP_DIR));
    }
}

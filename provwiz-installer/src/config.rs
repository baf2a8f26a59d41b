//! Layered configuration: built-in defaults, then the TOML file, then
//! environment overrides. CLI flags are applied last by the caller.

use anyhow::{Context, Result};
use provwiz_backend::ForemanApiConfig;
use provwiz_workflow::params::{INSTALL_MEDIUM_NAME, SUBNET_DISPLAY_NAME};
use provwiz_workflow::{SequencerOptions, ServicePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/provwiz/config.toml";
pub const CONFIG_ENV: &str = "PROVWIZ_CONFIG";
pub const PASSWORD_ENV: &str = "PROVWIZ_PASSWORD";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub wizard: WizardConfig,
    pub services: ServicePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost".to_string(),
            username: None,
            password: None,
            timeout_secs: 60,
            user_agent: concat!("provwiz/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub medium_name: String,
    pub subnet_name: String,
    /// Delete every host group once the wizard has finished.
    pub cleanup_hostgroups: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            medium_name: INSTALL_MEDIUM_NAME.to_string(),
            subnet_name: SUBNET_DISPLAY_NAME.to_string(),
            cleanup_hostgroups: true,
        }
    }
}

impl Config {
    /// `$PROVWIZ_CONFIG` if set, otherwise the system-wide file.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse config TOML")
    }

    pub fn apply_env(&mut self) {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            if !password.is_empty() {
                self.backend.password = Some(password);
            }
        }
    }

    pub fn api_config(&self) -> ForemanApiConfig {
        ForemanApiConfig {
            base_url: self.backend.url.clone(),
            username: self.backend.username.clone(),
            password: self.backend.password.clone(),
            timeout_secs: self.backend.timeout_secs,
            user_agent: self.backend.user_agent.clone(),
        }
    }

    pub fn sequencer_options(&self) -> SequencerOptions {
        SequencerOptions {
            subnet_name: self.wizard.subnet_name.clone(),
            medium_name: self.wizard.medium_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::parse(
            r#"
[backend]
url = "https://foreman.example.org"
username = "admin"

[services]
simulate = true
run_for_real = ["postgresql"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend.url, "https://foreman.example.org");
        assert_eq!(cfg.backend.timeout_secs, 60);
        assert_eq!(cfg.wizard, WizardConfig::default());
        assert!(cfg.services.must_actually_run("postgresql"));
        assert!(!cfg.services.must_actually_run("foreman"));
    }

    #[test]
    fn password_env_overrides_file() {
        let _guard = test_env::lock();
        std::env::set_var(PASSWORD_ENV, "s3cret");
        let mut cfg = Config::parse("[backend]\npassword = \"from-file\"\n").unwrap();
        cfg.apply_env();
        std::env::remove_var(PASSWORD_ENV);
        assert_eq!(cfg.backend.password.as_deref(), Some("s3cret"));
        assert_eq!(cfg.api_config().password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn config_env_selects_path() {
        let _guard = test_env::lock();
        std::env::set_var(CONFIG_ENV, "/tmp/provwiz-test.toml");
        let path = Config::default_path();
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(path, PathBuf::from("/tmp/provwiz-test.toml"));
        assert_eq!(Config::default_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Config::parse("[wizard]\ncleanup_hostgroups = \"maybe\"\n").is_err());
    }
}

//! Job configuration and tool settings.
//!
//! `JobConfig` is what a job author configures for the release step.
//! `Settings` carries the server connection and deployment-wait tuning,
//! loaded once at startup and passed explicitly to the components.

use std::path::Path;
use std::time::Duration;

use octopus_api::ServerConfig;
use serde::{Deserialize, Serialize};

use crate::domain::error::{RecorderError, Result};
use crate::domain::package::PackageConfiguration;

/// Release step configuration for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Project name as defined in Octopus.
    pub project: String,
    pub release_version: String,
    /// Attach release notes to the release.
    pub release_notes: bool,
    /// Where the notes come from: `file` or `scm`.
    pub release_notes_source: String,
    /// Workspace-relative notes file, when the source is `file`.
    pub release_notes_file: String,
    pub deploy_this_release: bool,
    pub environment: String,
    pub wait_for_deployment: bool,
    pub package_configs: Vec<PackageConfiguration>,
}

impl JobConfig {
    /// Trim every free-text field.
    pub fn normalized(mut self) -> Self {
        self.project = self.project.trim().to_string();
        self.release_version = self.release_version.trim().to_string();
        self.release_notes_source = self.release_notes_source.trim().to_string();
        self.release_notes_file = self.release_notes_file.trim().to_string();
        self.environment = self.environment.trim().to_string();
        self.package_configs = self
            .package_configs
            .iter()
            .map(|pc| PackageConfiguration::new(&pc.package_name, &pc.package_version))
            .collect();
        self
    }

    /// Load a job configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: JobConfig = toml::from_str(&content)
            .map_err(|e| RecorderError::Configuration(format!("{}: {e}", path.display())))?;
        Ok(config.normalized())
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_wait_timeout_secs() -> u64 {
    600
}

/// How long to follow a deployment task when waiting for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        WaitSettings {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl WaitSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "ServerConfig::from_env")]
    pub server: ServerConfig,
    #[serde(default)]
    pub deployment: WaitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerConfig::from_env(),
            deployment: WaitSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply
    /// `OCTOPUS_HOST` / `OCTOPUS_API_KEY` / `OCTOPUS_TIMEOUT_SECS` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<Settings>(&content)
                    .map_err(|e| RecorderError::Settings(format!("{}: {e}", path.display())))?
            }
            None => Settings::default(),
        };
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OCTOPUS_HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(key) = lookup("OCTOPUS_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.server.api_key = key.trim().to_string();
        }
        if let Some(timeout) = lookup("OCTOPUS_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.server.timeout_secs = timeout;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(RecorderError::Settings(
                "Octopus host is not configured (set server.host or OCTOPUS_HOST)".to_string(),
            ));
        }
        if self.server.api_key.trim().is_empty() {
            return Err(RecorderError::Settings(
                "API key is not configured (set server.api_key or OCTOPUS_API_KEY)".to_string(),
            ));
        }
        if self.server.timeout_secs == 0 {
            return Err(RecorderError::Settings(
                "server.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.deployment.poll_interval_secs == 0 {
            return Err(RecorderError::Settings(
                "deployment.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

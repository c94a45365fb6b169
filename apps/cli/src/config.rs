//! CLI configuration.
//!
//! Stored as JSON in `~/.config/taskdeck/config.json` (`%APPDATA%\taskdeck`
//! on Windows). Every field is optional in the file; flags and environment
//! variables override what the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use taskdeck_upload::HttpTransportConfig;

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Persistent CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the storage API.
    pub api_url: String,

    /// Bearer token sent to the storage API. Empty means none.
    pub api_token: String,

    pub connect_timeout_secs: u64,

    /// Whole-request timeout; 0 disables it.
    pub request_timeout_secs: u64,

    /// How many times a failed upload is started again from scratch.
    pub retries: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_token: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 0,
            retries: 0,
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub retries: Option<u32>,
}

impl CliConfig {
    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the defaults. A file that cannot be parsed is
    /// logged and also yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str::<CliConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Writes the configuration to `path`, readable by the owner only.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies flag and environment overrides. Empty strings are ignored.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.api_url.filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = overrides.api_token.filter(|t| !t.is_empty()) {
            self.api_token = token;
        }
        if let Some(retries) = overrides.retries {
            self.retries = retries;
        }
    }

    /// Checks values that would only fail later, mid-upload.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("api_url must start with http:// or https://, got {url:?}");
        }
        Ok(())
    }

    /// Transport settings derived from this configuration.
    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            api_token: Some(self.api_token.clone()).filter(|t| !t.is_empty()),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_token.is_empty() {
            copy.api_token = "********".into();
        }
        copy
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    config_base_dir().join("taskdeck").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}

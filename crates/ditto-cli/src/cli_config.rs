//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use ditto_core::config::{non_blank, normalize_endpoint, ENV_SYNC_TIMEOUT_SECS, ENV_SYNC_URL};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ditto")
        .join(CONFIG_FILE_NAME)
}

impl CliConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Update stored sync settings; `None` keeps the current value.
    pub fn apply(
        &mut self,
        endpoint: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<(), String> {
        if let Some(endpoint) = endpoint {
            let endpoint = normalize_endpoint(endpoint).map_err(|error| error.to_string())?;
            self.endpoint = Some(endpoint);
        }
        if let Some(secs) = timeout_secs {
            if secs == 0 {
                return Err("timeout must be at least one second".to_string());
            }
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Value for a `DITTO_SYNC_*` name, for layering under the process env.
    pub fn lookup(&self, name: &str) -> Option<String> {
        match name {
            ENV_SYNC_URL => self.endpoint.clone(),
            ENV_SYNC_TIMEOUT_SECS => self.timeout_secs.map(|secs| secs.to_string()),
            _ => None,
        }
    }

    fn normalize(&mut self) {
        self.version = self.version.max(default_config_version());
        self.endpoint = non_blank(self.endpoint.take());
        self.timeout_secs = self.timeout_secs.filter(|secs| *secs > 0);
    }
}

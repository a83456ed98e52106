//! Dashboard configuration.
//!
//! Lives at `~/.config/evdash/config.toml`; any key can be overridden from the
//! environment, e.g. `EVDASH_STORE__MEDIUM=memory` or `EVDASH_TIMEZONE=Europe/Oslo`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COLLECTION, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::error::{DashError, DashResult};
use crate::store::{EventStore, LocalStore, MemoryStore, RemoteStore};

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// IANA zone used to read and display wall-clock dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            timezone: default_timezone(),
            store: StoreConfig::default(),
        }
    }
}

/// Which medium backs the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "medium", rename_all = "snake_case")]
pub enum StoreConfig {
    Local(LocalSettings),
    Remote(RemoteSettings),
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Local(LocalSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Defaults to the platform data directory (`~/.local/share/evdash` on Linux).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            data_dir: None,
            collection: default_collection(),
        }
    }
}

impl LocalSettings {
    pub fn data_path(&self) -> DashResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(PathBuf::from(
                shellexpand::tilde(&dir.to_string_lossy()).into_owned(),
            )),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| DashError::Config("Could not determine data directory".into()))?
                .join("evdash")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Root of the document service, e.g. `https://events.example.com/v1`.
    pub base_url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Skip anonymous sign-in and use this identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Sent as a bearer token when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        RemoteSettings {
            base_url: base_url.into(),
            collection: default_collection(),
            user_id: None,
            api_key: None,
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl DashboardConfig {
    pub fn config_dir() -> DashResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| DashError::Config("Could not determine config directory".into()))?
            .join("evdash"))
    }

    pub fn config_path() -> DashResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load `~/.config/evdash/config.toml`, writing a commented default first
    /// if there is none.
    pub fn load() -> DashResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> DashResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("EVDASH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DashError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| DashError::Config(e.to_string()))
    }

    pub fn timezone(&self) -> DashResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| DashError::Config(format!("Unknown time zone '{}'", self.timezone)))
    }

    /// Build the store adapter this configuration selects.
    pub async fn open_store(&self) -> DashResult<Arc<dyn EventStore>> {
        let tz = self.timezone()?;

        let store: Arc<dyn EventStore> = match &self.store {
            StoreConfig::Local(local) => {
                Arc::new(LocalStore::new(local.data_path()?, &local.collection, tz))
            }
            StoreConfig::Remote(remote) => {
                let identity_path = Self::config_dir()?.join("identity.toml");
                Arc::new(RemoteStore::connect(remote, &identity_path).await?)
            }
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
        };

        Ok(store)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> DashResult<()> {
        let contents = "\
# evdash configuration

# Zone used for entering and showing dates:
# timezone = \"UTC\"

# Keep events in a local file (default):
# [store]
# medium = \"local\"
# data_dir = \"~/.local/share/evdash\"
# collection = \"events\"

# Or sync them with a remote document collection:
# [store]
# medium = \"remote\"
# base_url = \"https://events.example.com/v1\"
# poll_interval_secs = 5
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DashError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DashError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_loads_as_local_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        DashboardConfig::create_default_config(&path).unwrap();

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config.store, StoreConfig::Local(LocalSettings::default()));
        assert_eq!(config.timezone().unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn test_remote_settings_fill_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "timezone = \"Asia/Tokyo\"\n\n[store]\nmedium = \"remote\"\nbase_url = \"http://localhost:9000\"\n",
        )
        .unwrap();

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config.store, StoreConfig::Remote(RemoteSettings::new("http://localhost:9000")));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_unknown_timezone_is_config_error() {
        let config = DashboardConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(matches!(config.timezone(), Err(DashError::Config(_))));
    }

    #[test]
    fn test_local_data_dir_expands_tilde() {
        let settings = LocalSettings {
            data_dir: Some(PathBuf::from("~/events")),
            ..Default::default()
        };
        let path = settings.data_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("events"));
    }
}

use crate::error::{LeadflowError, Result};
use crate::rules::FollowUpRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the config file and database, resolved relative to the
/// data root.
pub const DATA_DIR: &str = ".leadflow";
pub const CONFIG_FILE: &str = "leadflow.yaml";

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Stage changes are POSTed here when set; otherwise they only go to the
    /// log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Process-wide configuration, loaded once at startup and passed into the
/// engine. Every field has a default so a missing or partial file still
/// yields a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Database filename inside the data directory.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub followups: FollowUpRules,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_version() -> u32 {
    1
}

fn default_database() -> String {
    "leadflow.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: default_database(),
            followups: FollowUpRules::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(DATA_DIR).join(CONFIG_FILE)
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        root.join(DATA_DIR).join(&self.database)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        if !path.exists() {
            return Err(LeadflowError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults instead of an
    /// error. Used by surfaces that can run without an initialized root.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Ok(config) => Ok(config),
            Err(LeadflowError::NotInitialized) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.notify.webhook_url = Some("https://hooks.example.com/crm".to_string());
        config.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.database, "leadflow.db");
        assert_eq!(
            loaded.notify.webhook_url.as_deref(),
            Some("https://hooks.example.com/crm")
        );
        assert_eq!(loaded.followups.len(), Config::default().followups.len());
    }

    #[test]
    fn load_without_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(LeadflowError::NotInitialized)
        ));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(config.database, "leadflow.db");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Config::config_path(dir.path());
        crate::io::atomic_write(&path, b"database: crm.db\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.database, "crm.db");
        assert_eq!(config.version, 1);
        assert!(config.followups.rule_for(Stage::Contacted).is_some());
    }

    #[test]
    fn followup_overrides_replace_the_table() {
        let dir = TempDir::new().unwrap();
        let yaml = "followups:\n  negotiation:\n    delay_days: 1\n    reason: Close it\n";
        crate::io::atomic_write(&Config::config_path(dir.path()), yaml.as_bytes()).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.followups.len(), 1);
        assert_eq!(
            config.followups.rule_for(Stage::Negotiation).unwrap().reason,
            "Close it"
        );
        assert!(config.followups.rule_for(Stage::Contacted).is_none());
    }

    #[test]
    fn db_path_lives_under_data_dir() {
        let config = Config::default();
        let path = config.db_path(Path::new("/srv/crm"));
        assert_eq!(path, PathBuf::from("/srv/crm/.leadflow/leadflow.db"));
    }
}

//! cdship.toml configuration parser.
//!
//! The configuration is loaded once at startup, overlaid with `CDSHIP_*`
//! environment variables, and then passed by reference into every component
//! that needs it. Commands that reach AWS validate it first.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cdship.toml";

/// Deployment strategy used when none is configured.
pub const DEFAULT_DEPLOYMENT_CONFIG: &str = "CodeDeployDefault.OneAtATime";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root. Relative paths resolve against the config file's directory.
    pub root: PathBuf,
    /// Directory that gets archived, relative to `root`.
    pub source_dir: PathBuf,
    /// Archive file name, written inside `source_dir`.
    pub archive_name: String,
    /// Shell command that populates `source_dir` before archiving.
    pub prepare: Option<String>,
    /// Skip unreadable entries instead of aborting the archive.
    pub skip_unreadable: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            source_dir: PathBuf::from("dist"),
            archive_name: "app.zip".to_string(),
            prepare: None,
            skip_unreadable: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub application: String,
    pub bucket: String,
    /// Object key; falls back to the archive name.
    pub key: Option<String>,
    pub deployment_config: String,
    pub poll_interval_secs: u64,
    pub deadline_secs: Option<u64>,
    pub confirm_interval_secs: u64,
    pub confirm_timeout_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            application: String::new(),
            bucket: String::new(),
            key: None,
            deployment_config: DEFAULT_DEPLOYMENT_CONFIG.to_string(),
            poll_interval_secs: 1,
            deadline_secs: None,
            confirm_interval_secs: 5,
            confirm_timeout_secs: 300,
        }
    }
}

impl ShipConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ShipConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.project.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.project.root = dir.join(&config.project.root);
            }
        }
        Ok(config)
    }

    /// Load the config file (if any) and apply environment overrides.
    ///
    /// An explicitly requested file must exist; the default `cdship.toml` is
    /// optional so that a fully env-driven setup works. Callers that talk to
    /// AWS run [`ShipConfig::validate`] afterwards.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overlay `CDSHIP_*` values returned by `lookup` onto this config.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = set("CDSHIP_APPLICATION") {
            self.deploy.application = v;
        }
        if let Some(v) = set("CDSHIP_BUCKET") {
            self.deploy.bucket = v;
        }
        if let Some(v) = set("CDSHIP_REGION") {
            self.aws.region = Some(v);
        }
        if let Some(v) = set("CDSHIP_PROFILE") {
            self.aws.profile = Some(v);
        }
        if let Some(v) = set("CDSHIP_CREDENTIALS_FILE") {
            self.aws.credentials_file = Some(PathBuf::from(v));
        }
        if let Some(v) = set("CDSHIP_ENDPOINT_URL") {
            self.aws.endpoint_url = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deploy.application.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "deploy.application is empty (set it in cdship.toml or CDSHIP_APPLICATION)".into(),
            ));
        }
        if self.deploy.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "deploy.bucket is empty (set it in cdship.toml or CDSHIP_BUCKET)".into(),
            ));
        }
        if self.project.archive_name.trim().is_empty() {
            return Err(ConfigError::Invalid("project.archive_name is empty".into()));
        }
        if self.deploy.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "deploy.poll_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn source_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.source_dir)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.source_dir().join(&self.project.archive_name)
    }

    pub fn object_key(&self) -> &str {
        self.deploy
            .key
            .as_deref()
            .unwrap_or(&self.project.archive_name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.deploy.poll_interval_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deploy.deadline_secs.map(Duration::from_secs)
    }

    pub fn confirm_interval(&self) -> Duration {
        Duration::from_secs(self.deploy.confirm_interval_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy.confirm_timeout_secs)
    }
}

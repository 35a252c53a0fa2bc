//! Node configuration: YAML file or environment variables.
//!
//! ```yaml
//! moltbook:
//!   api_key: "moltbook_xxx"
//! swarm_node:
//!   name: "CodeWorker"
//!   description: "Writes and reviews code"
//!   skills: ["#SKILL_CODE", "#SKILL_PYTHON"]
//!   check_interval_secs: 60
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://www.moltbook.com/api/v1";
pub const DEFAULT_NODE_NAME: &str = "AIWorker";
pub const DEFAULT_COMMUNITY: &str = "general";

/// Files tried by `SwarmConfig::auto_load`, in order. The home-relative one
/// is appended at runtime.
const LOCAL_CONFIG_FILES: [&str; 2] = ["config.yaml", "config.yml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Platform access.
#[derive(Debug, Clone, Deserialize)]
pub struct MoltbookConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// How this node presents itself and how often it polls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    pub description: String,
    /// Capability tags. Empty means "whatever the registry advertises".
    pub skills: Vec<String>,
    pub check_interval_secs: u64,
    pub auto_claim: bool,
    pub reward_reputation: bool,
    pub feed_limit: usize,
    /// Community new tasks are published into.
    pub community: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NODE_NAME.to_string(),
            description: String::new(),
            skills: Vec::new(),
            check_interval_secs: 60,
            auto_claim: true,
            reward_reputation: true,
            feed_limit: 25,
            community: DEFAULT_COMMUNITY.to_string(),
        }
    }
}

impl NodeConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwarmConfig {
    pub moltbook: MoltbookConfig,
    #[serde(rename = "swarm_node", default)]
    pub node: NodeConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl SwarmConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load from any variable source. `lookup` returns `None` for unset keys.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("MOLTBOOK_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar("MOLTBOOK_API_KEY"))?;

        let defaults = NodeConfig::default();
        let config = Self {
            moltbook: MoltbookConfig {
                api_key,
                base_url: lookup("MOLTBOOK_BASE_URL").unwrap_or_else(default_base_url),
            },
            node: NodeConfig {
                name: lookup("SWARM_NODE_NAME").unwrap_or(defaults.name),
                description: lookup("SWARM_NODE_DESC").unwrap_or_default(),
                skills: lookup("SWARM_NODE_SKILLS")
                    .map(|v| split_list(&v))
                    .unwrap_or_default(),
                check_interval_secs: parse_var(&lookup, "SWARM_CHECK_INTERVAL")?
                    .unwrap_or(defaults.check_interval_secs),
                auto_claim: lookup("SWARM_AUTO_CLAIM")
                    .map(|v| v.to_lowercase() != "false")
                    .unwrap_or(defaults.auto_claim),
                reward_reputation: lookup("SWARM_REWARD_REPUTATION")
                    .map(|v| v.to_lowercase() != "false")
                    .unwrap_or(defaults.reward_reputation),
                feed_limit: defaults.feed_limit,
                community: defaults.community,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// First existing config file, else the environment.
    pub fn auto_load() -> Result<Self, ConfigError> {
        match candidate_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_file(path)
            }
            None => Self::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.moltbook.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("api_key must not be empty".to_string()));
        }
        if self.node.check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.node.feed_limit == 0 {
            return Err(ConfigError::Invalid("feed_limit must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = LOCAL_CONFIG_FILES.iter().map(PathBuf::from).collect();
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config/moltswarm/config.yaml"));
    }
    paths
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{key}={raw} is not a number"))),
    }
}

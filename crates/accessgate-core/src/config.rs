//! Evaluator configuration: which membership oracle to use and how to bound it.
//!
//! ```yaml
//! directory:
//!   base_url: https://directory.example.com/v1/
//!   groups:
//!     SUPER_USER: 5f1c0d2e-admins
//!     HR_RU: 0b77c1aa-hr-readers
//! check_timeout_ms: 2000
//! ```
//!
//! Without a `directory` section the static `members` table is used.

use crate::errors::ConfigError;
use crate::group::Group;
use crate::oracle::{DirectoryOracle, MembershipOracle, StaticOracle, TimeoutOracle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const ENV_DIRECTORY_URL: &str = "ACCESSGATE_DIRECTORY_URL";
pub const ENV_DIRECTORY_TOKEN: &str = "ACCESSGATE_DIRECTORY_TOKEN";
pub const ENV_CHECK_TIMEOUT_MS: &str = "ACCESSGATE_CHECK_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    pub base_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Directory object id for each group.
    #[serde(default)]
    pub groups: BTreeMap<Group, String>,
}

impl DirectoryConfig {
    pub fn is_plaintext(&self) -> bool {
        self.base_url.scheme() != "https"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessgateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,
    /// Static principal → groups table, used when no directory is configured.
    #[serde(default)]
    pub members: BTreeMap<String, Vec<Group>>,
    /// Per-check deadline. Unset means checks are never cut short.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_timeout_ms: Option<u64>,
}

impl AccessgateConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Override from `ACCESSGATE_*` environment variables.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_DIRECTORY_URL) {
            let base_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            match &mut self.directory {
                Some(directory) => directory.base_url = base_url,
                None => {
                    self.directory = Some(DirectoryConfig {
                        base_url,
                        token: None,
                        groups: BTreeMap::new(),
                    })
                }
            }
        }

        if let Some(token) = lookup(ENV_DIRECTORY_TOKEN) {
            match &mut self.directory {
                Some(directory) => directory.token = Some(token),
                None => warn!("{} is set but no directory is configured", ENV_DIRECTORY_TOKEN),
            }
        }

        if let Some(raw) = lookup(ENV_CHECK_TIMEOUT_MS) {
            let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_CHECK_TIMEOUT_MS.to_string(),
                value: raw.clone(),
            })?;
            self.check_timeout_ms = Some(ms);
        }

        Ok(self)
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_ms.map(Duration::from_millis)
    }

    pub fn build_oracle(&self) -> Result<Arc<dyn MembershipOracle>, ConfigError> {
        let base: Arc<dyn MembershipOracle> = match &self.directory {
            Some(directory) => {
                let unmapped: Vec<Group> = Group::ALL
                    .into_iter()
                    .filter(|g| !directory.groups.contains_key(g))
                    .collect();
                if !unmapped.is_empty() {
                    warn!(
                        unmapped = ?unmapped,
                        "groups without a directory mapping will fail every check"
                    );
                }
                if directory.is_plaintext() {
                    warn!(
                        url = %directory.base_url,
                        "directory url is not https; membership answers can be tampered with"
                    );
                }
                Arc::new(DirectoryOracle::new(directory)?)
            }
            None => Arc::new(StaticOracle::from_table(&self.members)),
        };

        Ok(match self.check_timeout() {
            Some(after) => Arc::new(TimeoutOracle::new(base, after)),
            None => base,
        })
    }
}

//! Engine configuration, read from the environment

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

pub const DB_PATH_ENV_VAR: &str = "EVENT_VERSIONS_DB_PATH";
pub const TEMPORARY_ENV_VAR: &str = "EVENT_VERSIONS_TEMPORARY";
pub const MAX_CODE_LEN_ENV_VAR: &str = "EVENT_VERSIONS_MAX_CODE_LEN";

const DEFAULT_DB_PATH: &str = "event-versions.db";
const DEFAULT_MAX_CODE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Delete the database when the last handle drops.
    pub temporary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub max_code_len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub lifecycle: LifecycleConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            temporary: false,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_code_len: DEFAULT_MAX_CODE_LEN,
        }
    }
}

impl StoreConfig {
    pub fn open(&self) -> anyhow::Result<Arc<sled::Db>> {
        let db = sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary)
            .open()
            .with_context(|| format!("failed to open version store at {}", self.path.display()))?;
        Ok(Arc::new(db))
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_ENV_VAR) {
            config.store.path = PathBuf::from(path);
        }
        if let Some(flag) = lookup(TEMPORARY_ENV_VAR) {
            config.store.temporary = flag == "true" || flag == "1";
        }
        if let Some(len) = lookup(MAX_CODE_LEN_ENV_VAR) {
            config.lifecycle.max_code_len = len
                .parse()
                .with_context(|| format!("{MAX_CODE_LEN_ENV_VAR} is not a number: {len}"))?;
        }

        Ok(config)
    }
}

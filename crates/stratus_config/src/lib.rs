mod auth;
pub mod definitions;

pub use auth::*;

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratusConfig {
    pub base_url: String,

    #[serde(default = "StratusConfig::default_version")]
    pub version: String,
}

impl StratusConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            version: Self::default_version(),
        }
    }

    fn default_version() -> String {
        definitions::DEFAULT_API_VERSION.to_owned()
    }

    pub fn load() -> Result<Self> {
        let path: PathBuf = [
            std::env::current_dir()?,
            definitions::TOOL_DIR.into(),
            definitions::TOOL_DEFAULT_CONFIG_FILE.into(),
        ]
        .iter()
        .collect();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("loading config file from: {}", &path.display());
        let mut config: Self =
            serde_yaml_ng::from_str(&read_to_string(path)?).map_err(|e| anyhow!(e))?;
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        Ok(config)
    }
}

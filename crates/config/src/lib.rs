#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod query_cost;
pub mod schema;

use std::path::{Path, PathBuf};

pub use query_cost::*;
pub use schema::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read the configuration at {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Configuration of the query guard.
pub struct Config {
    /// Cost and depth limits, and the argument lists driving cost classification
    pub query_cost: QueryCostConfig,
    /// Root query allow-list and mutation toggle
    pub schema: SchemaConfig,
}

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        Self::from_toml(&input)
    }
}

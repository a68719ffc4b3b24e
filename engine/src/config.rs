use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Index build settings. The defaults give the standard layouts: 8-term blocks and
/// front-coding chunks of 4 sharing at least 2 characters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub block_size: usize,
    pub front_coding_chunk: usize,
    pub min_shared_prefix: usize,
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { block_size: 8, front_coding_chunk: 4, min_shared_prefix: 2, top_k: 5 }
    }
}

impl IndexConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: IndexConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid("block_size must be at least 1"));
        }
        if self.front_coding_chunk == 0 {
            return Err(Error::invalid("front_coding_chunk must be at least 1"));
        }
        if self.min_shared_prefix == 0 {
            return Err(Error::invalid("min_shared_prefix must be at least 1"));
        }
        if self.top_k == 0 {
            return Err(Error::invalid("top_k must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: IndexConfig = serde_json::from_str(r#"{ "top_k": 10 }"#).unwrap();
        assert_eq!(config.top_k, 10);
        assert_eq!(config.block_size, 8);
        assert_eq!(config.front_coding_chunk, 4);
        config.validate().unwrap();
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let config = IndexConfig { block_size: 0, ..IndexConfig::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, r#"{ "block_size": 16, "min_shared_prefix": 3 }"#).unwrap();
        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.block_size, 16);
        assert_eq!(config.min_shared_prefix, 3);
        assert_eq!(config.top_k, 5);
    }
}

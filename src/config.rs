//! Server configuration loaded from TOML.
//!
//! ```toml
//! addr = "0.0.0.0:8080"
//!
//! [upload]
//! max_memory = 8388608   # bytes; 0 or absent means 32 MiB
//! max_body = 8388608     # bytes; 0 or absent means max_memory
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Socket address passed to [`Server::serve`](crate::Server::serve).
    pub addr: String,
    pub upload: UploadConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest multipart body parsed into memory, in bytes.
    pub max_memory: u64,
    /// Largest request body the server buffers, in bytes.
    pub max_body: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_owned(),
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

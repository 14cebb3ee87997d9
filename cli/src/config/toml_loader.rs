//! TOML configuration file loading.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Deserialize a TOML file into `T`.
///
/// A missing file deserializes from an empty document, so every table in
/// `T` must be `#[serde(default)]`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return toml::from_str("").context("Failed to create empty config");
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_str(&content, &path.display().to_string())
}

/// Deserialize TOML text, labelling errors with `origin`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] if the text is not valid for `T`.
pub fn parse_str<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| {
        ConfigError::InvalidSyntax {
            file: origin.to_string(),
            message: e.message().to_string(),
        }
        .into()
    })
}

//! Taiwanese configuration that extends the base `Config` from core.
//!
//! This configuration includes:
//! - All generic options from `libtaigi_core::Config` (flattened via serde)
//! - The keyboard layout
//! - Where the static dictionary and the user phrase store live
//!
//! # Example
//!
//! ```rust
//! use libtaigi::TaigiConfig;
//!
//! let config = TaigiConfig::default();
//! let base_config = config.into_base();
//! assert_eq!(base_config.candidates_per_page, 10);
//! ```

use std::path::{Path, PathBuf};

use libtaigi_core::{Config, KeyboardLayout, Result, TaigiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TaigiConfig {
    /// Base configuration fields (paging, selection keys, learning, ...)
    #[serde(flatten)]
    pub base: Config,

    /// Layout name, e.g. `tailo`, `standard`, `hsu`
    pub keyboard_layout: KeyboardLayout,

    /// Directory holding `index.bin` and `phrase.bin`
    pub data_dir: Option<PathBuf>,

    /// redb file for learned phrases; in memory when unset
    pub user_store_path: Option<PathBuf>,
}

impl TaigiConfig {
    /// Convert this config into the base config used by `ImeEngine::new()`
    pub fn into_base(self) -> Config {
        self.base
    }

    /// Get a reference to the base config
    pub fn base(&self) -> &Config {
        &self.base
    }

    /// Get a mutable reference to the base config
    pub fn base_mut(&mut self) -> &mut Config {
        &mut self.base
    }

    /// Load from TOML. Invalid base values fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text =
            toml::to_string_pretty(self).map_err(|e| TaigiError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: TaigiConfig =
            toml::from_str(content).map_err(|e| TaigiError::InvalidConfig(e.to_string()))?;
        config.base = config.base.sanitized();
        Ok(config)
    }
}

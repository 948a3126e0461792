//! Controller configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Controller behavior knobs.
///
/// Can be built in code or loaded from TOML:
///
/// ```toml
/// load_pages_automatically = true
/// preload_margin = 20
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerOptions {
    /// Whether reading an unset index asks the data source for its page.
    pub load_pages_automatically: bool,
    /// Forward offset used to preload an upcoming page during a read. Zero
    /// disables preloading.
    pub preload_margin: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            load_pages_automatically: true,
            preload_margin: 0,
        }
    }
}

impl ControllerOptions {
    /// Parses options from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, OptionsError> {
        toml::from_str(source).map_err(|source| OptionsError::Parse { source })
    }

    /// Renders the options as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, OptionsError> {
        toml::to_string_pretty(self).map_err(|source| OptionsError::Serialize { source })
    }

    /// Sets [`load_pages_automatically`](Self::load_pages_automatically).
    pub fn load_pages_automatically(mut self, enabled: bool) -> Self {
        self.load_pages_automatically = enabled;
        self
    }

    /// Sets [`preload_margin`](Self::preload_margin).
    pub fn preload_margin(mut self, margin: usize) -> Self {
        self.preload_margin = margin;
        self
    }
}

/// Errors raised while loading or rendering options.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// TOML input could not be parsed.
    #[error("failed to parse controller options: {source}")]
    Parse {
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// Options could not be rendered as TOML.
    #[error("failed to serialize controller options: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: toml::ser::Error,
    },
}

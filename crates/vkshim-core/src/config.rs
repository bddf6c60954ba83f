use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;

/// Layer settings, loaded from vkshim.toml. Every field has a default so a
/// missing or partial file still yields a working layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Master switch for handle virtualization. Off means every identity is
    /// forwarded verbatim and the layer keeps no per-object state.
    #[serde(default = "default_true")]
    pub wrap_handles: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self { wrap_handles: true }
    }
}

impl LayerSettings {
    /// Load settings from the file named by VKSHIM_CONFIG, falling back to
    /// defaults when the variable is unset or the file is unusable.
    pub fn load() -> Self {
        let Ok(path) = std::env::var("VKSHIM_CONFIG") else {
            return Self::default();
        };
        Self::from_file(&path).unwrap_or_else(|err| {
            warn!(path, %err, "ignoring unusable layer config");
            Self::default()
        })
    }

    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|err| CoreError::Config(err.to_string()))
    }
}

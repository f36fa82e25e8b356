//! Registry settings with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Environment variables: `MODELGRAPH_*` prefix

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::application::error::{ModelError, ModelResult};

fn config_err(e: config::ConfigError) -> ModelError {
    ModelError::Config {
        message: e.to_string(),
    }
}

/// Settings governing registry behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrySettings {
    /// Freeze node state against writes once realization completes, unless a
    /// rule decides otherwise for its node.
    pub immutable_after_realize: bool,

    /// Include unrealized placeholder leaves when rendering the node tree.
    pub render_unrealized: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            immutable_after_realize: false,
            render_unrealized: true,
        }
    }
}

impl RegistrySettings {
    /// Load settings: compiled defaults overridden by `MODELGRAPH_*`
    /// environment variables (explicit overrides, they replace).
    pub fn load() -> ModelResult<Self> {
        let mut settings = Self::default();

        let config = Config::builder()
            .add_source(Environment::with_prefix("MODELGRAPH"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("immutable_after_realize") {
            settings.immutable_after_realize = val;
        }
        if let Ok(val) = config.get_bool("render_unrealized") {
            settings.render_unrealized = val;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_environment_when_loading_then_defaults_apply() {
        let settings = RegistrySettings::load().unwrap();
        assert_eq!(settings, RegistrySettings::default());
    }

    #[test]
    fn given_defaults_then_nodes_stay_mutable_and_rendering_is_full() {
        let settings = RegistrySettings::default();
        assert!(!settings.immutable_after_realize);
        assert!(settings.render_unrealized);
    }
}

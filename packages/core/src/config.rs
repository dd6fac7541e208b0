use crate::error::{KontextError, KontextResult};
use crate::providers::{DEFAULT_ATTRIBUTE, DEFAULT_PATTERN};
use crate::settings::Settings;
use kontext_common::DEFAULT_MAX_ITERATIONS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "kontext.config.json";

/// Kontext configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KontextConfig {
    /// Define missing keys when an extension targets them
    #[serde(default = "default_true")]
    pub greedy: bool,

    /// Attribute read by the attribute provider
    #[serde(default = "default_attribute")]
    pub attribute: String,

    /// Placeholder pattern of the text provider; group 1 is the key, group 2 the initial value
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Resolve unique prefixes of extension names
    #[serde(default = "default_true")]
    pub abbreviate_extensions: bool,

    /// Providers run by `bind`, in order
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,

    /// Runaway guard of the event loop
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,
}

fn default_true() -> bool {
    true
}

fn default_attribute() -> String {
    DEFAULT_ATTRIBUTE.to_string()
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_providers() -> Vec<String> {
    vec!["attribute".to_string(), "text".to_string()]
}

fn default_max_loop_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for KontextConfig {
    fn default() -> Self {
        Self {
            greedy: true,
            attribute: default_attribute(),
            pattern: default_pattern(),
            abbreviate_extensions: true,
            providers: default_providers(),
            max_loop_iterations: default_max_loop_iterations(),
        }
    }
}

impl KontextConfig {
    /// Parse and validate a configuration document
    pub fn from_json_str(source: &str) -> KontextResult<Self> {
        let config: KontextConfig =
            serde_json::from_str(source).map_err(|e| KontextError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `kontext.config.json` from a directory, falling back to the defaults
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(Self::from_json_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> KontextResult<()> {
        if let Err(e) = Regex::new(&self.pattern) {
            return Err(KontextError::config(format!("invalid pattern: {}", e)));
        }
        if self.max_loop_iterations == 0 {
            return Err(KontextError::config("maxLoopIterations must be positive"));
        }
        Ok(())
    }

    /// Public settings seeded from this configuration
    pub fn into_settings(self) -> Settings {
        Settings::new()
            .with("greedy", self.greedy)
            .with("attribute", self.attribute)
            .with("pattern", self.pattern)
            .with("abbreviateExtensions", self.abbreviate_extensions)
            .with("providers", self.providers)
    }
}

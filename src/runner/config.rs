//! Engine configuration file parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::compiler::CompileOptions;
use crate::runner::ds::realm::DEFAULT_MAX_CALL_DEPTH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_call_depth must be at least 1")]
    ZeroCallDepth,
}

/// Engine settings. Missing keys take their defaults.
///
/// Expected format:
/// ```json
/// { "strict": false, "specialize": true, "max_call_depth": 512 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Treat every script as strict code.
    pub strict: bool,
    /// Let the compiler keep statically typed locals unboxed.
    pub specialize: bool,
    /// Nested calls allowed before `RangeError` is raised.
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strict: false,
            specialize: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        if config.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict: self.strict,
            specialize: self.specialize,
        }
    }
}

//! Typed learner configuration, persisted as TOML.
//!
//! [`LearnerConfig`] renders to the space-delimited configuration string the
//! native engine expects. Only common options are typed; anything else goes
//! through `extra` untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Options used to build a native configuration string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Suppress native diagnostics output.
    #[serde(default = "default_quiet")]
    pub quiet: bool,
    /// Ignore labels: `learn` behaves like `predict`.
    #[serde(default)]
    pub test_only: bool,
    /// Loss function name, e.g. `squared` or `logistic`.
    #[serde(default)]
    pub loss_function: Option<String>,
    /// Link function name: `identity`, `logistic` or `glf1`.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub learning_rate: Option<f32>,
    /// Model to start from (`-i`).
    #[serde(default)]
    pub initial_regressor: Option<PathBuf>,
    /// Where the model is written on close (`-f`).
    #[serde(default)]
    pub final_regressor: Option<PathBuf>,
    /// Raw tokens appended verbatim.
    #[serde(default)]
    pub extra: Vec<String>,
}

fn default_quiet() -> bool {
    true
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            quiet: default_quiet(),
            test_only: false,
            loss_function: None,
            link: None,
            learning_rate: None,
            initial_regressor: None,
            final_regressor: None,
            extra: Vec::new(),
        }
    }
}

impl LearnerConfig {
    /// Render the native configuration string.
    pub fn to_args(&self) -> String {
        let mut args: Vec<String> = Vec::new();
        if self.quiet {
            args.push("--quiet".into());
        }
        if self.test_only {
            args.push("-t".into());
        }
        if let Some(loss) = &self.loss_function {
            args.push(format!("--loss_function {loss}"));
        }
        if let Some(link) = &self.link {
            args.push(format!("--link {link}"));
        }
        if let Some(rate) = self.learning_rate {
            args.push(format!("-l {rate}"));
        }
        if let Some(path) = &self.initial_regressor {
            args.push(format!("-i {}", path.display()));
        }
        if let Some(path) = &self.final_regressor {
            args.push(format!("-f {}", path.display()));
        }
        args.extend(self.extra.iter().cloned());
        args.join(" ")
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

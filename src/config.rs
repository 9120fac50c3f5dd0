//! JIT configuration.
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! opt_level = "speed"
//! dispatch = "dedicated"
//! register_host_symbols = true
//! trace_ir = false
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] values.

use std::path::Path;

use serde::Deserialize;

use crate::jit::types::{JitError, JitResult};

/// Cranelift optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting
    pub fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// How storage, balance and block-hash operations reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvDispatch {
    /// Through the keyed `evm.query` / `evm.update` entry points
    #[default]
    Generic,
    /// Through the dedicated `env_sload`, `env_sstore`, `env_balance` and
    /// `env_blockhash` symbols
    Dedicated,
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JitConfig {
    #[serde(default)]
    pub opt_level: OptLevel,

    #[serde(default)]
    pub dispatch: EnvDispatch,

    /// Install this crate's host entry points in the JIT symbol table.
    /// Disable when the embedder registers its own.
    #[serde(default = "default_true")]
    pub register_host_symbols: bool,

    /// Log the IR of every compiled chunk at trace level
    #[serde(default)]
    pub trace_ir: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JitConfig {
    fn default() -> Self {
        JitConfig {
            opt_level: OptLevel::default(),
            dispatch: EnvDispatch::default(),
            register_host_symbols: true,
            trace_ir: false,
        }
    }
}

impl JitConfig {
    /// Parse a configuration from TOML content.
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a configuration file.
    pub fn load_from_path(path: &Path) -> JitResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| JitError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse_toml(&content)
            .map_err(|e| JitError::Config(format!("{}: {}", path.display(), e)))
    }
}

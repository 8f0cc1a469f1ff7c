//! Optimizer configuration
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! level = "full"
//! float_mode = "fast-math"
//! max_passes = 16
//! max_loop_iterations = 10000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How much rewriting to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptLevel {
    /// Leave trees unchanged
    None,
    /// Constant evaluation and partial evaluation only
    Fold,
    /// Folding plus the algebraic rule library
    #[default]
    Full,
}

/// Floating-point rewriting policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloatMode {
    /// Only rewrites that are bit-exact under IEEE 754
    #[default]
    Strict,
    /// Also rewrites that may change rounding, signed zero or NaN results
    FastMath,
}

/// Tunables shared by the interpreter and the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    pub level: OptLevel,
    pub float_mode: FloatMode,
    /// Upper bound on fixpoint passes
    pub max_passes: usize,
    /// Iterations a single loop may run during evaluation
    pub max_loop_iterations: usize,
    /// Nesting bound for recursive evaluation
    pub max_depth: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            level: OptLevel::Full,
            float_mode: FloatMode::Strict,
            max_passes: 16,
            max_loop_iterations: 10_000,
            max_depth: 512,
        }
    }
}

impl OptimizerOptions {
    pub fn fast_math(&self) -> bool {
        self.float_mode == FloatMode::FastMath
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| EngineError::config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

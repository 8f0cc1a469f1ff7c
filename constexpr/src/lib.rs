//! Constexpr Library
//!
//! Compile-time partial evaluation and algebraic rewriting of typed
//! expression/statement trees.
//!
//! The three entry points never fail: an input that cannot be evaluated or
//! improved comes back as `None` or unchanged.

pub mod analysis;
pub mod ast;
pub mod config;
pub mod error;
pub mod host;
pub mod interp;
pub mod optimize;
pub mod util;

use std::sync::Once;

pub use ast::{BinOp, Node, Type, UnOp};
pub use config::{FloatMode, OptLevel, OptimizerOptions};
pub use error::{EngineError, Result};
pub use host::{Host, HostLibrary};
pub use interp::{Environment, Value, VariableItem};
pub use optimize::{CancellationToken, OptimizationStats, Optimizer};

/// Fully evaluate `node` with the standard host library
pub fn evaluate(node: &Node, env: &Environment) -> Option<Value> {
    Optimizer::new(&HostLibrary::standard()).evaluate(node, env)
}

/// Best single rewrite of `node` with the standard host library
pub fn try_optimize(node: &Node, env: &Environment) -> Option<Node> {
    Optimizer::new(&HostLibrary::standard()).try_optimize(node, env)
}

/// Optimize `tree` until nothing changes, with the standard host library
pub fn optimize_to_fixpoint(tree: &Node, env: &Environment) -> Node {
    Optimizer::new(&HostLibrary::standard()).optimize_to_fixpoint(tree, env)
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Only installs a subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=constexpr=trace` to see every rule that fires.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}

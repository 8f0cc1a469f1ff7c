//! Static analyses the rewrite rules rely on
//!
//! - `purity`: side-effect and trap freedom, read/write sets
//! - `equivalence`: conservative "same value" test
//! - `range`: integer interval inference and comparison decisions
//! - `typing`: result type of an expression

pub mod equivalence;
pub mod purity;
pub mod range;
pub mod typing;

pub use equivalence::equivalent;
pub use purity::{assigned_variables, has_writes, is_pure, read_variables};
pub use range::{Interval, RangeScope};
pub use typing::{conditional_type, infer_type};

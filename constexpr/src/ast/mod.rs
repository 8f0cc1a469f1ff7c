//! Expression/statement tree definitions

mod display;
mod expr;
mod typed;
mod types;

pub use expr::*;
pub use typed::*;
pub use types::*;

//! Regfilegen --- Generate AXI memory mapped register files from a declarative list of registers.
//!
//! The address space planner ([`plan`]) validates the register declarations and derives the bus
//! geometry, which a [`Render`] implementation then turns into hardware description source text.

// Export full API at crate root
pub use api::*;

mod api;
mod error;
mod frontend;
mod model;
mod plan;
mod render;
mod util;

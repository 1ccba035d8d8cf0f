//! Field path module - Addresses nested fields inside a value.
//!
//! Paths are shared by ignore-path pruning and patch generation, and are written
//! as JSON pointers.

mod path;
mod pointer;

pub use path::*;
pub use pointer::*;

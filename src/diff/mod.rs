//! Comparison of desired and current state.
//!
//! A [`Changeset`] classifies every resource identity found in either list as
//! created, updated, deleted or in sync. Updates carry a rendered diff and the
//! [`PatchOperation`]s that turn the current body into the desired one.

mod changeset;
mod ignore;
pub mod patch;
mod render;


pub use changeset::*;
pub use ignore::*;
pub use patch::{Operation, PatchOperation};
pub use render::{render_addition, render_removal, render_update};

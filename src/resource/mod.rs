//! Resource module - Cluster objects, filters over them, and lists of them.
//!
//! Both sides of a comparison are a `ResourceList`: the desired state built from
//! rendered templates and the current state built from a platform export.

mod filter;
mod item;
mod list;


pub use filter::*;
pub use item::*;
pub use list::ResourceList;

pub(crate) use filter::resolve_kind;
pub(crate) use list::{parse_documents, unwrap_container};

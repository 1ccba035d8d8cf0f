//! # Tailor
//!
//! Compares the resources declared by processed OpenShift templates (the desired
//! state) with the resources present in a namespace (the current state).
//!
//! Both sides are read into [`ResourceList`]s of loosely typed [`Value`] trees.
//! A [`Changeset`] matches them by kind and name and classifies every resource as
//! to create, to update, to delete or in sync. Updates carry a rendered diff and
//! the patch operations turning the current body into the desired one.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of YAML/JSON documents with path based access
//! - [`fieldpath`] - Paths into value trees and their JSON pointer syntax
//! - [`resource`] - Resource items, filters and lists
//! - [`diff`] - Changesets, patch generation and diff rendering
//! - [`platform`] - Collaborators exporting the current state and processing templates
//! - [`config`] - Options of a comparison
//! - [`status`] - The status pipeline and its report

pub mod config;
pub mod diff;
pub mod error;
pub mod fieldpath;
pub mod platform;
pub mod resource;
pub mod status;
pub mod value;

pub use diff::{Action, Change, Changeset, IgnorePath, Operation, PatchOperation, Summary};
pub use error::{Error, ParseError, Result};
pub use fieldpath::{Path, PathElement};
pub use resource::{ResourceFilter, ResourceItem, ResourceList, Source};
pub use value::Value;

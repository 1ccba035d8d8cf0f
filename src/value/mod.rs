//! Value module - In-memory representation of YAML/JSON objects.
//!
//! This module provides the schema-less tree resources are held in, plus
//! path-addressed get/set/delete on it.

mod access;
mod value;

pub use value::*;

//! A single cluster object and its normalization rules.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::error::{ParseError, Result};
use crate::fieldpath::Path;
use crate::value::{self, Map, Value};

/// Annotation listing, comma separated, the annotation keys the tool manages.
pub const MANAGED_ANNOTATIONS_KEY: &str = "tailor.opendevstack.org/managed-annotations";

/// Fields the live platform injects that have no counterpart in a template.
static PLATFORM_MANAGED_FIELDS: Lazy<Vec<Path>> = Lazy::new(|| {
    vec![
        Path::from_fields(["status"]),
        Path::from_fields(["metadata", "resourceVersion"]),
        Path::from_fields(["metadata", "uid"]),
        Path::from_fields(["metadata", "creationTimestamp"]),
        Path::from_fields(["metadata", "generation"]),
        Path::from_fields(["metadata", "selfLink"]),
        Path::from_fields(["metadata", "managedFields"]),
    ]
});

/// Source tells where a resource was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Rendered from a template (desired state).
    Template,
    /// Exported from the platform (current state).
    Platform,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Template => write!(f, "template"),
            Source::Platform => write!(f, "platform"),
        }
    }
}

/// ResourceItem is one cluster object.
///
/// Identity is the `(kind, name)` pair. Items are normalized on construction and
/// not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub source: Source,
    pub kind: String,
    pub name: String,
    /// Namespace from the document, if it declares one.
    pub namespace: Option<String>,
    pub labels: IndexMap<String, String>,
    pub annotations: IndexMap<String, String>,
    /// The full object body.
    pub config: Value,
}

impl ResourceItem {
    /// Parses a raw object into a normalized item.
    ///
    /// Fails if the object is not a map or lacks a string `kind` or `metadata.name`.
    pub fn new(raw: Value, source: Source) -> Result<ResourceItem> {
        let Some(map) = raw.as_map() else {
            return Err(ParseError::new(format!(
                "expected resource to be a map, got {}",
                raw.type_name()
            ))
            .with_context(excerpt(&raw))
            .into());
        };

        let kind = match map.get("kind") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(missing_field("kind", &raw).into()),
        };
        let metadata = map.get("metadata").and_then(Value::as_map);
        let name = match metadata.and_then(|m| m.get("name")) {
            Some(Value::String(name)) => name.clone(),
            _ => return Err(missing_field("metadata.name", &raw).into()),
        };
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let labels = string_map(metadata, "labels", &raw)?;
        let annotations = string_map(metadata, "annotations", &raw)?;

        let mut item = ResourceItem {
            source,
            kind,
            name,
            namespace,
            labels,
            annotations,
            config: raw,
        };

        match source {
            Source::Platform => {
                item.strip_platform_fields();
                item.remove_unmanaged_annotations();
            }
            Source::Template => item.record_managed_annotations(),
        }
        Ok(item)
    }

    /// Returns "Kind/Name".
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    /// Returns the item's namespace, or `default` if the document declares none.
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }

    /// Annotation keys listed in the managed-annotations annotation.
    pub fn managed_annotations(&self) -> Vec<String> {
        self.annotations
            .get(MANAGED_ANNOTATIONS_KEY)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deletes every annotation the tool does not manage, so annotations the
    /// platform adds on its own do not show up as drift.
    pub fn remove_unmanaged_annotations(&mut self) {
        let managed = self.managed_annotations();
        let unmanaged: Vec<String> = self
            .annotations
            .keys()
            .filter(|key| key.as_str() != MANAGED_ANNOTATIONS_KEY && !managed.contains(*key))
            .cloned()
            .collect();

        for key in unmanaged {
            trace!(item = %self.full_name(), annotation = %key, "removing unmanaged annotation");
            self.annotations.shift_remove(&key);
            self.config
                .delete_path(&Path::from_fields(["metadata", "annotations", key.as_str()]));
        }

        let annotations_path = Path::from_fields(["metadata", "annotations"]);
        let emptied = matches!(
            self.config.get_path(&annotations_path),
            Some(Value::Map(m)) if m.is_empty()
        ) || matches!(self.config.get_path(&annotations_path), Some(Value::Null));
        if emptied {
            self.config.delete_path(&annotations_path);
        }
    }

    fn strip_platform_fields(&mut self) {
        for path in PLATFORM_MANAGED_FIELDS.iter() {
            self.config.delete_path(path);
        }
    }

    // Templates carry the list of their annotation keys so the platform side can
    // tell managed annotations from ones it added itself.
    fn record_managed_annotations(&mut self) {
        if self.annotations.is_empty() || self.annotations.contains_key(MANAGED_ANNOTATIONS_KEY) {
            return;
        }
        let mut keys: Vec<&str> = self.annotations.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let list = keys.join(",");

        let path = Path::from_fields(["metadata", "annotations", MANAGED_ANNOTATIONS_KEY]);
        if self.config.set_path(&path, Value::String(list.clone())).is_ok() {
            self.annotations
                .insert(MANAGED_ANNOTATIONS_KEY.to_string(), list);
        }
    }
}

impl fmt::Display for ResourceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

fn string_map(metadata: Option<&Map>, field: &str, raw: &Value) -> Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    let Some(value) = metadata.and_then(|m| m.get(field)) else {
        return Ok(out);
    };
    let map = match value {
        Value::Null => return Ok(out),
        Value::Map(map) => map,
        other => {
            return Err(ParseError::new(format!(
                "metadata.{} must be a map, got {}",
                field,
                other.type_name()
            ))
            .with_context(excerpt(raw))
            .into())
        }
    };
    for (key, value) in map.iter() {
        let Some(text) = value.scalar_to_string() else {
            return Err(ParseError::new(format!(
                "metadata.{}.{} must be a string, got {}",
                field,
                key,
                value.type_name()
            ))
            .with_context(excerpt(raw))
            .into());
        };
        out.insert(key.clone(), text);
    }
    Ok(out)
}

fn missing_field(field: &str, raw: &Value) -> ParseError {
    ParseError::new(format!("resource has no string '{}'", field)).with_context(excerpt(raw))
}

pub(crate) fn excerpt(raw: &Value) -> String {
    value::to_json(raw).unwrap_or_default()
}

//! Ordered, identity-unique collections of resources.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, trace};

use super::filter::ResourceFilter;
use super::item::{excerpt, ResourceItem, Source};
use crate::error::{Error, ParseError, Result};
use crate::value::Value;

/// ResourceList is an ordered collection of resources with unique identities.
///
/// Items keep the order in which they were discovered in their source
/// documents. Every item satisfies the filter the list was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceList {
    source: Source,
    items: Vec<ResourceItem>,
    index: HashMap<(String, String), usize>,
}

impl ResourceList {
    /// Creates an empty list.
    pub fn new(source: Source) -> Self {
        ResourceList {
            source,
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Builds the desired state from rendered template output.
    ///
    /// Each buffer holds a bare resource, a `Template` with `objects`, or a
    /// `List` with `items`; a buffer may contain several YAML documents.
    pub fn from_templates<B: AsRef<[u8]>>(filter: &ResourceFilter, inputs: &[B]) -> Result<Self> {
        let mut list = ResourceList::new(Source::Template);
        for input in inputs {
            for object in parse_objects(input.as_ref())? {
                list.append_filtered(filter, object)?;
            }
        }
        debug!(count = list.len(), "assembled template based resource list");
        Ok(list)
    }

    /// Builds the current state from a platform export.
    ///
    /// An empty export yields an empty list.
    pub fn from_platform(filter: &ResourceFilter, input: &[u8]) -> Result<Self> {
        let mut list = ResourceList::new(Source::Platform);
        for object in parse_objects(input)? {
            list.append_filtered(filter, object)?;
        }
        debug!(count = list.len(), "assembled platform based resource list");
        Ok(list)
    }

    /// Appends the items of `other`, in order. Lists built independently (for
    /// instance one per template directory) are combined through this.
    pub fn merge(mut self, other: ResourceList) -> Result<Self> {
        for item in other.items {
            self.push(item)?;
        }
        Ok(self)
    }

    fn append_filtered(&mut self, filter: &ResourceFilter, raw: Value) -> Result<()> {
        let item = ResourceItem::new(raw, self.source)?;
        if !filter.satisfied_by(&item) {
            trace!(item = %item.full_name(), source = %self.source, "skipping item not matching filter");
            return Ok(());
        }
        trace!(item = %item.full_name(), source = %self.source, "adding item");
        self.push(item)
    }

    /// Appends an item, failing if its identity is already taken.
    pub fn push(&mut self, item: ResourceItem) -> Result<()> {
        let key = (item.kind.clone(), item.name.clone());
        if self.index.contains_key(&key) {
            return Err(Error::DuplicateIdentity {
                name: item.full_name(),
            });
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Looks up an item by identity.
    pub fn get(&self, kind: &str, name: &str) -> Result<&ResourceItem> {
        self.find(kind, name)
            .ok_or_else(|| Error::not_found(kind, name))
    }

    /// Looks up an item by identity, returning None on a miss.
    pub fn find(&self, kind: &str, name: &str) -> Option<&ResourceItem> {
        self.index
            .get(&(kind.to_string(), name.to_string()))
            .and_then(|&i| self.items.get(i))
    }

    /// Returns true if an item with this identity exists.
    pub fn contains(&self, kind: &str, name: &str) -> bool {
        self.find(kind, name).is_some()
    }

    /// Returns where the items were read from.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Returns the items in discovery order.
    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResourceList {
    type Item = &'a ResourceItem;
    type IntoIter = std::slice::Iter<'a, ResourceItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Splits a buffer into the raw resource objects it holds.
fn parse_objects(input: &[u8]) -> Result<Vec<Value>> {
    let mut objects = Vec::new();
    for document in parse_documents(input)? {
        objects.extend(unwrap_container(document)?);
    }
    Ok(objects)
}

/// Parses every YAML document in the buffer, skipping empty ones.
pub(crate) fn parse_documents(input: &[u8]) -> Result<Vec<Value>> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(input) {
        let value = Value::deserialize(document).map_err(|e| ParseError::from_yaml(&e, input))?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Returns the objects of a `Template` or the items of a `List`, or the document
/// itself when it is a bare resource.
pub(crate) fn unwrap_container(document: Value) -> Result<Vec<Value>> {
    let field = match document.as_map().and_then(|m| m.get("kind")).and_then(Value::as_str) {
        Some("Template") => "objects",
        Some("List") => "items",
        _ => return Ok(vec![document]),
    };
    let invalid = document
        .as_map()
        .and_then(|m| m.get(field))
        .filter(|objects| !objects.is_list() && !objects.is_null());
    if let Some(other) = invalid {
        return Err(ParseError::new(format!("'{}' must be a list, got {}", field, other.type_name()))
            .with_context(excerpt(&document))
            .into());
    }
    let Value::Map(mut map) = document else {
        return Ok(Vec::new());
    };
    match map.delete(field) {
        Some(Value::List(objects)) => Ok(objects),
        _ => Ok(Vec::new()),
    }
}

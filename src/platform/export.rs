//! Turning the current state of a namespace into a template.

use tracing::debug;

use super::{Export, Exporter};
use crate::error::{Error, ParseError, Result};
use crate::fieldpath::{Path, PathElement};
use crate::resource::{parse_documents, unwrap_container, ResourceFilter, ResourceItem, Source};
use crate::value::{to_yaml, Map, Value};

/// Exports the resources matching `filter` as a YAML template.
///
/// The export may be a `Template` or a `List` of resources. Every object is
/// normalized like a platform item, objects not satisfying the filter are
/// dropped and the template's own metadata is removed. Returns an empty string
/// when nothing was found.
pub fn export_as_template<E: Exporter + ?Sized>(
    exporter: &E,
    filter: &ResourceFilter,
    namespace: &str,
) -> Result<String> {
    let document = match exporter.export(filter, namespace)? {
        Export::NoResourcesFound => return Ok(String::new()),
        Export::Document(document) => document,
    };
    let mut documents = parse_documents(&document)?.into_iter();
    let Some(first) = documents.next() else {
        return Ok(String::new());
    };

    let objects_path = Path::from_elements(vec![PathElement::field_name("objects")]);
    let (mut template, mut objects) = if is_template(&first) {
        let mut template = first;
        let objects = match template.get_path_mut(&objects_path) {
            Some(Value::List(objects)) => std::mem::take(objects),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(ParseError::new(format!(
                    "objects of exported template must be a list, got {}",
                    other.type_name()
                ))
                .into())
            }
        };
        (template, objects)
    } else {
        (empty_template(), unwrap_container(first)?)
    };
    for document in documents {
        objects.extend(unwrap_container(document)?);
    }

    let mut kept = Vec::with_capacity(objects.len());
    for object in objects {
        let item = ResourceItem::new(object, Source::Platform)?;
        if filter.satisfied_by(&item) {
            kept.push(item.config);
        } else {
            debug!(item = %item.full_name(), "dropping item not matching filter");
        }
    }
    debug!(count = kept.len(), "exported objects");

    template.set_path(&objects_path, Value::List(kept))?;
    template.delete_path(&Path::from_elements(vec![PathElement::field_name("metadata")]));

    to_yaml(&template).map_err(|e| Error::render("template", e))
}

fn is_template(document: &Value) -> bool {
    document.as_map().and_then(|m| m.get("kind")).and_then(Value::as_str) == Some("Template")
}

fn empty_template() -> Value {
    let mut template = Map::new();
    template.set("apiVersion".into(), Value::from("v1"));
    template.set("kind".into(), Value::from("Template"));
    template.set("objects".into(), Value::List(Vec::new()));
    Value::Map(template)
}

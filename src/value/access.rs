//! Path-addressed access to values.
//!
//! A `PathElement::Index` addresses a list position, but on a map it falls back to
//! the decimal key so that pointers like `/data/0` reach a key named "0".

use super::value::{Map, Value};
use crate::error::{Error, Result};
use crate::fieldpath::{Path, PathElement};

impl Value {
    /// Returns the value at `path`, or None if any step is missing.
    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for element in path {
            current = child(current, element)?;
        }
        Some(current)
    }

    /// Returns a mutable reference to the value at `path`.
    pub fn get_path_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut current = self;
        for element in path {
            current = child_mut(current, element)?;
        }
        Some(current)
    }

    /// Returns true if `path` resolves to a value.
    pub fn has_path(&self, path: &Path) -> bool {
        self.get_path(path).is_some()
    }

    /// Sets the value at `path`, creating intermediate maps as needed.
    ///
    /// An existing list index is overwritten; an index equal to the list length
    /// appends.
    pub fn set_path(&mut self, path: &Path, value: Value) -> Result<()> {
        let Some((last, parents)) = path.as_slice().split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        for (depth, element) in parents.iter().enumerate() {
            if current.is_null() {
                *current = Value::Map(Map::new());
            }
            current = match current {
                Value::Map(map) => {
                    let key = element_key(element);
                    if !map.has(&key) {
                        map.set(key.clone(), Value::Map(Map::new()));
                    }
                    map.get_mut(&key)
                        .ok_or_else(|| Error::patch(prefix(path, depth + 1), "missing parent"))?
                }
                Value::List(items) => match element {
                    PathElement::Index(i) => items.get_mut(*i).ok_or_else(|| {
                        Error::patch(prefix(path, depth + 1), "index out of bounds")
                    })?,
                    PathElement::FieldName(name) => {
                        return Err(Error::patch(
                            prefix(path, depth + 1),
                            format!("cannot address list with field '{}'", name),
                        ))
                    }
                },
                other => {
                    return Err(Error::patch(
                        prefix(path, depth + 1),
                        format!("cannot descend into {}", other.type_name()),
                    ))
                }
            };
        }

        if current.is_null() {
            *current = Value::Map(Map::new());
        }
        match current {
            Value::Map(map) => {
                map.set(element_key(last), value);
                Ok(())
            }
            Value::List(items) => {
                let index = list_index(last, items.len(), path)?;
                if index == items.len() {
                    items.push(value);
                } else {
                    items[index] = value;
                }
                Ok(())
            }
            other => Err(Error::patch(
                path.to_string(),
                format!("parent is a {}", other.type_name()),
            )),
        }
    }

    /// Inserts a value at `path`. In a list the element is inserted before the
    /// given index, shifting later elements; in a map this behaves like `set_path`.
    pub fn insert_path(&mut self, path: &Path, value: Value) -> Result<()> {
        let Some((last, parents)) = path.as_slice().split_last() else {
            *self = value;
            return Ok(());
        };
        let parent_path = Path::from_elements(parents.to_vec());
        let parent = self
            .get_path_mut(&parent_path)
            .ok_or_else(|| Error::patch(path.to_string(), "parent does not exist"))?;
        match parent {
            Value::Map(map) => {
                map.set(element_key(last), value);
                Ok(())
            }
            Value::List(items) => {
                let index = list_index(last, items.len(), path)?;
                items.insert(index, value);
                Ok(())
            }
            other => Err(Error::patch(
                path.to_string(),
                format!("parent is a {}", other.type_name()),
            )),
        }
    }

    /// Deletes the value at `path`, returning it. Missing paths are a no-op.
    pub fn delete_path(&mut self, path: &Path) -> Option<Value> {
        let (last, parents) = path.as_slice().split_last()?;
        let parent_path = Path::from_elements(parents.to_vec());
        match self.get_path_mut(&parent_path)? {
            Value::Map(map) => map.delete(&element_key(last)),
            Value::List(items) => match last {
                PathElement::Index(i) if *i < items.len() => Some(items.remove(*i)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn child<'a>(value: &'a Value, element: &PathElement) -> Option<&'a Value> {
    match (value, element) {
        (Value::Map(map), _) => map.get(&element_key(element)),
        (Value::List(items), PathElement::Index(i)) => items.get(*i),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, element: &PathElement) -> Option<&'a mut Value> {
    match (value, element) {
        (Value::Map(map), _) => map.get_mut(&element_key(element)),
        (Value::List(items), PathElement::Index(i)) => items.get_mut(*i),
        _ => None,
    }
}

fn element_key(element: &PathElement) -> String {
    match element {
        PathElement::FieldName(name) => name.clone(),
        PathElement::Index(i) => i.to_string(),
    }
}

// "-" addresses the position past the last element.
fn list_index(element: &PathElement, len: usize, path: &Path) -> Result<usize> {
    match element {
        PathElement::Index(i) if *i <= len => Ok(*i),
        PathElement::Index(i) => Err(Error::patch(
            path.to_string(),
            format!("index {} out of bounds for list of length {}", i, len),
        )),
        PathElement::FieldName(name) if name == "-" => Ok(len),
        PathElement::FieldName(name) => Err(Error::patch(
            path.to_string(),
            format!("cannot address list with field '{}'", name),
        )),
    }
}

fn prefix(path: &Path, len: usize) -> String {
    Path::from_elements(path.as_slice()[..len].to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use crate::fieldpath::parse_pointer;
    use crate::value::{from_yaml, Value};
    use pretty_assertions::assert_eq;

    fn doc() -> Value {
        from_yaml(
            r#"
metadata:
  name: foo
  labels:
    app: foo
data:
  "0": zero
spec:
  ports:
  - port: 80
  - port: 443
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_get_path() {
        let value = doc();
        let name = value.get_path(&parse_pointer("/metadata/name").unwrap());
        assert_eq!(name, Some(&Value::String("foo".into())));

        let port = value.get_path(&parse_pointer("/spec/ports/1/port").unwrap());
        assert_eq!(port, Some(&Value::Int(443)));

        assert!(value.get_path(&parse_pointer("/spec/ports/5").unwrap()).is_none());
        assert!(value.get_path(&parse_pointer("/metadata/name/deeper").unwrap()).is_none());
    }

    #[test]
    fn test_numeric_token_on_map() {
        let value = doc();
        let zero = value.get_path(&parse_pointer("/data/0").unwrap());
        assert_eq!(zero, Some(&Value::String("zero".into())));
    }

    #[test]
    fn test_set_path_creates_parents() {
        let mut value = doc();
        let path = parse_pointer("/metadata/annotations/owner").unwrap();
        value.set_path(&path, Value::from("team-a")).unwrap();
        assert_eq!(value.get_path(&path), Some(&Value::String("team-a".into())));
    }

    #[test]
    fn test_set_path_on_scalar_fails() {
        let mut value = doc();
        let path = parse_pointer("/metadata/name/inner").unwrap();
        assert!(value.set_path(&path, Value::Int(1)).is_err());
    }

    #[test]
    fn test_insert_path_shifts_list() {
        let mut value = doc();
        let path = parse_pointer("/spec/ports/0").unwrap();
        value
            .insert_path(&path, from_yaml("port: 8080").unwrap())
            .unwrap();
        let ports = value
            .get_path(&parse_pointer("/spec/ports").unwrap())
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(ports.len(), 3);
        assert_eq!(
            value.get_path(&parse_pointer("/spec/ports/1/port").unwrap()),
            Some(&Value::Int(80))
        );
    }

    #[test]
    fn test_delete_path() {
        let mut value = doc();
        let removed = value.delete_path(&parse_pointer("/metadata/labels").unwrap());
        assert!(removed.is_some());
        assert!(!value.has_path(&parse_pointer("/metadata/labels").unwrap()));

        // Missing paths are ignored.
        assert!(value.delete_path(&parse_pointer("/status").unwrap()).is_none());

        let removed = value.delete_path(&parse_pointer("/spec/ports/0").unwrap());
        assert_eq!(removed, Some(from_yaml("port: 80").unwrap()));
    }
}

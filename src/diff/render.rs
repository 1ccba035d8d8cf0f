//! Human-readable rendering of changes.

use similar::TextDiff;

use crate::error::{Error, Result};
use crate::value::{to_yaml, Map, Value};

const CURRENT_HEADER: &str = "Current State (OpenShift cluster)";
const DESIRED_HEADER: &str = "Desired State (Processed template)";

/// Renders a resource that will be created: every line is an addition.
pub fn render_addition(desired: &Value) -> Result<String> {
    Ok(prefix_lines(&yaml(desired)?, "+ "))
}

/// Renders a resource that will be deleted: every line is a removal.
pub fn render_removal(current: &Value) -> Result<String> {
    Ok(prefix_lines(&yaml(current)?, "- "))
}

/// Renders the difference between the current and desired bodies as a unified diff.
///
/// Keys of the desired body are laid out in the order of the current body before
/// rendering, so key order alone never shows up as a change.
pub fn render_update(current: &Value, desired: &Value) -> Result<String> {
    let old = yaml(current)?;
    let new = yaml(&align(desired, current))?;
    let diff = TextDiff::from_lines(old.as_str(), new.as_str());
    Ok(diff
        .unified_diff()
        .context_radius(3)
        .header(CURRENT_HEADER, DESIRED_HEADER)
        .to_string())
}

fn yaml(value: &Value) -> Result<String> {
    to_yaml(value).map_err(|e| Error::render("document", e))
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.lines().count() * prefix.len());
    for line in text.lines() {
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Returns `value` with map keys reordered to follow `reference`. Keys missing from
/// `reference` keep their relative order after the shared ones.
fn align(value: &Value, reference: &Value) -> Value {
    match (value, reference) {
        (Value::Map(map), Value::Map(reference)) => {
            let mut aligned = Map::new();
            for (key, reference_child) in reference.iter() {
                if let Some(child) = map.get(key) {
                    aligned.set(key.clone(), align(child, reference_child));
                }
            }
            for (key, child) in map.iter() {
                if !reference.has(key) {
                    aligned.set(key.clone(), child.clone());
                }
            }
            Value::Map(aligned)
        }
        (Value::List(list), Value::List(reference)) => Value::List(
            list.iter()
                .enumerate()
                .map(|(i, child)| match reference.get(i) {
                    Some(reference_child) => align(child, reference_child),
                    None => child.clone(),
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_addition_and_removal() {
        let body = from_yaml("kind: ConfigMap\ndata:\n  foo: bar\n").unwrap();
        assert_eq!(
            render_addition(&body).unwrap(),
            "+ kind: ConfigMap\n+ data:\n+   foo: bar\n"
        );
        assert_eq!(
            render_removal(&body).unwrap(),
            "- kind: ConfigMap\n- data:\n-   foo: bar\n"
        );
    }

    #[test]
    fn test_render_update() {
        let current = from_yaml("kind: ConfigMap\ndata:\n  bar: baz\n").unwrap();
        let desired = from_yaml("kind: ConfigMap\ndata:\n  bar: qux\n").unwrap();
        let diff = render_update(&current, &desired).unwrap();

        assert!(diff.contains("--- Current State (OpenShift cluster)"));
        assert!(diff.contains("+++ Desired State (Processed template)"));
        assert!(diff.contains("-  bar: baz\n"));
        assert!(diff.contains("+  bar: qux\n"));
    }

    #[test]
    fn test_key_order_is_not_a_change() {
        let current = from_yaml("kind: ConfigMap\nmetadata:\n  name: foo\n  labels: {a: b}\ndata:\n  x: '1'\n").unwrap();
        let desired = from_yaml("data:\n  x: '2'\nmetadata:\n  labels: {a: b}\n  name: foo\nkind: ConfigMap\n").unwrap();
        let diff = render_update(&current, &desired).unwrap();

        let changed: Vec<&str> = diff
            .lines()
            .filter(|line| {
                (line.starts_with('+') || line.starts_with('-'))
                    && !line.starts_with("+++")
                    && !line.starts_with("---")
            })
            .collect();
        assert_eq!(changed, vec!["-  x: '1'", "+  x: '2'"]);
    }

    #[test]
    fn test_align_keeps_extra_keys() {
        let value = from_yaml("c: 3\na: 1\nb: 2\n").unwrap();
        let reference = from_yaml("b: 0\na: 0\n").unwrap();
        let keys: Vec<String> = align(&value, &reference)
            .as_map()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}

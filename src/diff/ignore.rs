//! Paths excluded from comparison.

use std::fmt;

use crate::error::{Error, Result};
use crate::fieldpath::{parse_pointer, Path};
use crate::resource::{resolve_kind, ResourceItem};
use crate::value::Value;

/// IgnorePath is a pointer removed from both sides before comparing.
///
/// Written as "/pointer", "Kind:/pointer" or "Kind:Name:/pointer"; the scoped forms
/// only apply to matching items. Kind aliases such as "dc" are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePath {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub path: Path,
}

impl IgnorePath {
    /// Parses an ignore path.
    pub fn parse(input: &str) -> Result<IgnorePath> {
        let input = input.trim();
        let (scope, pointer) = if input.starts_with('/') {
            ("", input)
        } else {
            match input.find(":/") {
                Some(i) => (&input[..i], &input[i + 1..]),
                None => {
                    return Err(Error::invalid_path(
                        input,
                        "expected a pointer such as /spec/replicas, optionally prefixed with kind: or kind:name:",
                    ))
                }
            }
        };

        let path = parse_pointer(pointer)?;
        if path.is_empty() {
            return Err(Error::invalid_path(input, "cannot ignore the whole document"));
        }

        let (kind, name) = match scope.split(':').collect::<Vec<_>>().as_slice() {
            [""] => (None, None),
            [kind] => (Some(scope_kind(input, kind)?), None),
            [kind, name] if !name.is_empty() => (Some(scope_kind(input, kind)?), Some(name.to_string())),
            _ => return Err(Error::invalid_path(input, "scope must be kind: or kind:name:")),
        };

        Ok(IgnorePath { kind, name, path })
    }

    /// Returns true if this path is pruned from the given item.
    pub fn applies_to(&self, item: &ResourceItem) -> bool {
        self.kind.as_ref().map_or(true, |kind| *kind == item.kind)
            && self.name.as_ref().map_or(true, |name| *name == item.name)
    }
}

fn scope_kind(input: &str, kind: &str) -> Result<String> {
    resolve_kind(kind, kind).map_err(|_| Error::invalid_path(input, format!("unknown kind '{}'", kind)))
}

impl fmt::Display for IgnorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = &self.kind {
            write!(f, "{}:", kind)?;
        }
        if let Some(name) = &self.name {
            write!(f, "{}:", name)?;
        }
        write!(f, "{}", self.path)
    }
}

/// Parses every ignore path, failing on the first malformed one.
pub fn parse_ignore_paths<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<IgnorePath>> {
    inputs
        .iter()
        .map(|input| IgnorePath::parse(input.as_ref()))
        .collect()
}

/// Returns a copy of the item's config without the ignore paths that apply to it.
/// Paths missing from the config are skipped.
pub fn prune(item: &ResourceItem, ignore_paths: &[IgnorePath]) -> Value {
    let mut config = item.config.clone();
    for ignore in ignore_paths.iter().filter(|ignore| ignore.applies_to(item)) {
        config.delete_path(&ignore.path);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Source;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    fn item(yaml: &str) -> ResourceItem {
        ResourceItem::new(from_yaml(yaml).unwrap(), Source::Template).unwrap()
    }

    #[test]
    fn test_parse_unscoped() {
        let ignore = IgnorePath::parse("/spec/replicas").unwrap();
        assert_eq!(ignore.kind, None);
        assert_eq!(ignore.name, None);
        assert_eq!(ignore.path, Path::from_fields(["spec", "replicas"]));
    }

    #[test]
    fn test_parse_scoped() {
        let ignore = IgnorePath::parse("dc:/spec/template/spec/containers/0/image").unwrap();
        assert_eq!(ignore.kind.as_deref(), Some("DeploymentConfig"));
        assert_eq!(ignore.name, None);

        let ignore = IgnorePath::parse("bc:foo:/spec/output/to/name").unwrap();
        assert_eq!(ignore.kind.as_deref(), Some("BuildConfig"));
        assert_eq!(ignore.name.as_deref(), Some("foo"));
        assert_eq!(format!("{}", ignore), "BuildConfig:foo:/spec/output/to/name");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["spec.replicas", "", "/", "dc:foo:bar:/x", "dc::/x", "no-such-kind:/x", "/a/~x"] {
            let result = IgnorePath::parse(input);
            // "/" addresses the key "" and is valid.
            if input == "/" {
                assert!(result.is_ok());
                continue;
            }
            assert!(
                matches!(result, Err(Error::InvalidPath { .. })),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_ignore_paths_fails_fast() {
        assert!(parse_ignore_paths(&["/a", "/b"]).is_ok());
        assert!(parse_ignore_paths(&["/a", "b"]).is_err());
    }

    #[test]
    fn test_prune_respects_scope() {
        let dc = item("kind: DeploymentConfig\nmetadata:\n  name: web\nspec:\n  replicas: 3\n  paused: false\n");
        let ignores = parse_ignore_paths(&["dc:web:/spec/replicas", "svc:/spec/paused", "/spec/missing"]).unwrap();

        let pruned = prune(&dc, &ignores);
        assert_eq!(
            pruned,
            from_yaml("kind: DeploymentConfig\nmetadata:\n  name: web\nspec:\n  paused: false\n").unwrap()
        );
        // The item itself is untouched.
        assert!(dc.config.has_path(&Path::from_fields(["spec", "replicas"])));
    }
}

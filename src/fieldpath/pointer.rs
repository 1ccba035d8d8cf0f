//! JSON pointer syntax for paths.
//!
//! Format (RFC 6901):
//! - the empty string is the whole document
//! - every other pointer is a sequence of "/token"
//! - "~1" encodes '/' and "~0" encodes '~' inside a token
//! - a token of plain decimal digits is an index

use super::path::{Path, PathElement};
use crate::error::{Error, Result};

/// Parses a JSON pointer into a Path.
pub fn parse_pointer(pointer: &str) -> Result<Path> {
    if pointer.is_empty() {
        return Ok(Path::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(Error::invalid_path(pointer, "pointer must start with '/'"));
    };

    rest.split('/')
        .map(|token| parse_token(pointer, token))
        .collect()
}

fn parse_token(pointer: &str, token: &str) -> Result<PathElement> {
    if is_index(token) {
        let index = token
            .parse::<usize>()
            .map_err(|e| Error::invalid_path(pointer, format!("invalid index: {}", e)))?;
        return Ok(PathElement::Index(index));
    }
    Ok(PathElement::FieldName(unescape_token(pointer, token)?))
}

// Leading zeros are not indices, "01" stays a field name.
fn is_index(token: &str) -> bool {
    !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'))
}

fn unescape_token(pointer: &str, token: &str) -> Result<String> {
    if !token.contains('~') {
        return Ok(token.to_string());
    }
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            Some(other) => {
                return Err(Error::invalid_path(
                    pointer,
                    format!("invalid escape sequence '~{}'", other),
                ))
            }
            None => return Err(Error::invalid_path(pointer, "dangling '~' at end of token")),
        }
    }
    Ok(out)
}

/// Escapes a field name for use as a pointer token.
pub fn escape_token(token: &str) -> String {
    if token.contains(['~', '/']) {
        token.replace('~', "~0").replace('/', "~1")
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer() {
        let path = parse_pointer("/spec/ports/0/port").unwrap();
        assert_eq!(
            path,
            Path::from_elements(vec![
                PathElement::field_name("spec"),
                PathElement::field_name("ports"),
                PathElement::index(0),
                PathElement::field_name("port"),
            ])
        );
    }

    #[test]
    fn test_parse_root() {
        assert!(parse_pointer("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_escapes() {
        let path = parse_pointer("/metadata/annotations/a~1b~0c").unwrap();
        assert_eq!(path.last(), Some(&PathElement::field_name("a/b~c")));
        assert_eq!(path.to_pointer(), "/metadata/annotations/a~1b~0c");
    }

    #[test]
    fn test_leading_zero_is_field() {
        let path = parse_pointer("/data/007").unwrap();
        assert_eq!(path.last(), Some(&PathElement::field_name("007")));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            parse_pointer("spec/replicas"),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            parse_pointer("/spec/a~2b"),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            parse_pointer("/spec/a~"),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_escape_token() {
        assert_eq!(escape_token("plain"), "plain");
        assert_eq!(escape_token("a/b"), "a~1b");
        assert_eq!(escape_token("~/"), "~0~1");
    }
}

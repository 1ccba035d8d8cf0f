//! Error types shared across the crate.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error is every failure the reconciliation core and its collaborators can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("duplicate resource {name}: identities must be unique within a list")]
    DuplicateIdentity { name: String },

    #[error("resource {kind}/{name} not found")]
    NotFound { kind: String, name: String },

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid filter '{input}': {reason}")]
    InvalidFilter { input: String, reason: String },

    #[error("failed to export {target} resources: {message}")]
    Export { target: String, message: String },

    #[error("could not process {file} template: {message}")]
    TemplateProcessing { file: String, message: String },

    #[error("cannot render {what}: {message}")]
    Render { what: String, message: String },

    #[error("cannot apply patch at '{path}': {reason}")]
    Patch { path: String, reason: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options: {message}")]
    Config { message: String },
}

impl Error {
    /// Creates a not found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid filter error.
    pub fn invalid_filter(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidFilter {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a patch application error.
    pub fn patch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Patch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an error for a value that could not be written out.
    pub fn render(what: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Render {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Creates an I/O error for the given file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// ParseError describes a malformed input document.
///
/// When the failure can be located, the offending line of the source document is
/// kept so the error can be diagnosed without the original input at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// 1-based line in the source document.
    pub line: Option<usize>,
    /// 1-based column in the source document.
    pub column: Option<usize>,
    /// Text of the offending line, or an excerpt of the offending object.
    pub context: Option<String>,
}

const MAX_CONTEXT_LEN: usize = 200;

impl ParseError {
    /// Creates a parse error without location information.
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            line: None,
            column: None,
            context: None,
        }
    }

    /// Attaches an excerpt of the offending document.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let mut context = context.into();
        if context.len() > MAX_CONTEXT_LEN {
            let mut cut = MAX_CONTEXT_LEN;
            while !context.is_char_boundary(cut) {
                cut -= 1;
            }
            context.truncate(cut);
            context.push_str("...");
        }
        self.context = Some(context);
        self
    }

    /// Builds a parse error from a YAML syntax error, pointing at the offending line of `source`.
    pub fn from_yaml(err: &serde_yaml::Error, source: &[u8]) -> Self {
        let mut parse_error = ParseError::new(err.to_string());
        if let Some(location) = err.location() {
            parse_error.line = Some(location.line());
            parse_error.column = Some(location.column());
            let text = String::from_utf8_lossy(source);
            if let Some(line) = text.lines().nth(location.line().saturating_sub(1)) {
                parse_error = parse_error.with_context(line);
            }
        }
        parse_error
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.message)?;
        match (&self.line, &self.context) {
            (Some(line), Some(context)) => write!(f, "\n{:>4} | {}", line, context),
            (None, Some(context)) => write!(f, "\n  in: {}", context),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_points_at_line() {
        let source = b"kind: ConfigMap\nname: foo: bar\n";
        let err = serde_yaml::from_slice::<serde_yaml::Value>(source).unwrap_err();
        let parse_error = ParseError::from_yaml(&err, source);

        assert_eq!(parse_error.line, Some(2));
        assert_eq!(parse_error.context.as_deref(), Some("name: foo: bar"));
        let display = format!("{}", parse_error);
        assert!(display.starts_with("parse error:"));
        assert!(display.contains(" | "));
    }

    #[test]
    fn test_parse_error_context_is_truncated() {
        let long = "x".repeat(500);
        let parse_error = ParseError::new("missing kind").with_context(long);
        let context = parse_error.context.unwrap();
        assert!(context.ends_with("..."));
        assert_eq!(context.len(), MAX_CONTEXT_LEN + 3);
    }

    #[test]
    fn test_error_display() {
        let err = Error::DuplicateIdentity {
            name: "ConfigMap/foo".into(),
        };
        assert!(format!("{}", err).contains("ConfigMap/foo"));

        let err = Error::render("document", "unsupported value");
        assert_eq!(format!("{}", err), "cannot render document: unsupported value");

        let err = Error::not_found("Service", "bar");
        assert_eq!(format!("{}", err), "resource Service/bar not found");
    }
}

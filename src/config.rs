//! Options of a comparison.
//!
//! Options are read from an optional YAML file and overridden by command line
//! flags. Keys in the file use the flag names:
//!
//! ```yaml
//! namespace: demo
//! selector: app=foo
//! ignore-paths:
//!   - dc:/spec/replicas
//! upsert-only: true
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::platform::TemplateParams;
use crate::resource::ResourceFilter;

/// DiffFormat is how updates are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiffFormat {
    /// Unified diff of the YAML bodies.
    #[default]
    Text,
    /// Patch operations as JSON.
    Json,
}

impl fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffFormat::Text => write!(f, "text"),
            DiffFormat::Json => write!(f, "json"),
        }
    }
}

/// CompareOptions controls which resources are compared and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CompareOptions {
    pub namespace: String,
    /// Single "key=value" label selector.
    pub selector: String,
    /// Kinds ("dc,svc") or a single "kind/name".
    pub resource: String,
    /// Comma separated kinds, "Kind/Name"s and "key=value" labels to leave out.
    pub exclude: String,
    /// Template files; directories stand for the YAML files they contain.
    pub template_files: Vec<PathBuf>,
    pub param_files: Vec<PathBuf>,
    pub param_dir: Option<PathBuf>,
    /// Template parameters as "NAME=value".
    pub params: Vec<String>,
    /// Labels set on every processed object.
    pub labels: Option<String>,
    pub ignore_unknown_parameters: bool,
    pub upsert_only: bool,
    /// Continue even if the templates declare no resources.
    pub force: bool,
    pub ignore_paths: Vec<String>,
    /// How updates are reported; text when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffFormat>,
}

impl CompareOptions {
    /// Reads options from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<CompareOptions> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(CompareOptions::default());
        }
        serde_yaml::from_str(&content).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Overrides these options with every value set in `cli`.
    ///
    /// Strings and lists override when non-empty, options when set and flags
    /// when true.
    pub fn merge_cli(mut self, cli: CompareOptions) -> CompareOptions {
        fn string(target: &mut String, value: String) {
            if !value.is_empty() {
                *target = value;
            }
        }
        fn list<T>(target: &mut Vec<T>, value: Vec<T>) {
            if !value.is_empty() {
                *target = value;
            }
        }

        string(&mut self.namespace, cli.namespace);
        string(&mut self.selector, cli.selector);
        string(&mut self.resource, cli.resource);
        string(&mut self.exclude, cli.exclude);
        list(&mut self.template_files, cli.template_files);
        list(&mut self.param_files, cli.param_files);
        list(&mut self.params, cli.params);
        list(&mut self.ignore_paths, cli.ignore_paths);
        if cli.param_dir.is_some() {
            self.param_dir = cli.param_dir;
        }
        if cli.labels.is_some() {
            self.labels = cli.labels;
        }
        self.ignore_unknown_parameters |= cli.ignore_unknown_parameters;
        self.upsert_only |= cli.upsert_only;
        self.force |= cli.force;
        if cli.diff.is_some() {
            self.diff = cli.diff;
        }
        self
    }

    pub fn diff_format(&self) -> DiffFormat {
        self.diff.unwrap_or_default()
    }

    /// Builds the filter selecting the compared resources.
    pub fn filter(&self) -> Result<ResourceFilter> {
        ResourceFilter::new(&self.resource, &self.selector, &self.exclude)
    }

    /// Returns the inputs for processing templates.
    pub fn template_params(&self) -> TemplateParams {
        TemplateParams {
            namespace: self.namespace.clone(),
            labels: self.labels.clone(),
            params: self.params.clone(),
            param_files: self.param_files.clone(),
            param_dir: self.param_dir.clone(),
            ignore_unknown_parameters: self.ignore_unknown_parameters,
        }
    }
}

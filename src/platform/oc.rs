//! Collaborators backed by the `oc` binary.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, warn};

use super::{file_name, Export, Exporter, Renderer, TemplateParams};
use crate::error::{Error, Result};
use crate::resource::{parse_documents, ResourceFilter};

/// Parameter set to the target namespace when a template declares it.
pub const NAMESPACE_PARAM: &str = "TAILOR_NAMESPACE";

const NO_RESOURCES_FOUND: &str = "no resources found";

/// OcClient exports and processes templates by running `oc`.
#[derive(Debug, Clone)]
pub struct OcClient {
    binary: PathBuf,
}

impl Default for OcClient {
    fn default() -> Self {
        OcClient::new()
    }
}

impl OcClient {
    /// Uses the `oc` found on the PATH.
    pub fn new() -> Self {
        OcClient {
            binary: PathBuf::from("oc"),
        }
    }

    /// Uses the given binary instead of `oc`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        OcClient {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[String]) -> std::io::Result<Output> {
        debug!(binary = %self.binary.display(), args = ?args, "running");
        Command::new(&self.binary).args(args).output()
    }

    fn spawn_error(&self, err: std::io::Error) -> String {
        if err.kind() == ErrorKind::NotFound {
            format!("{} not found, is it installed and on the PATH?", self.binary.display())
        } else {
            err.to_string()
        }
    }
}

impl Exporter for OcClient {
    fn export(&self, filter: &ResourceFilter, namespace: &str) -> Result<Export> {
        let target = filter.convert_to_target();
        let output = self.run(&export_args(filter, namespace)).map_err(|e| Error::Export {
            target: target.clone(),
            message: self.spawn_error(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains(NO_RESOURCES_FOUND) {
                debug!(target = %target, "no resources found");
                return Ok(Export::NoResourcesFound);
            }
            return Err(Error::Export {
                target,
                message: stderr.trim().to_string(),
            });
        }

        debug!(target = %target, "exported resources");
        Ok(Export::Document(output.stdout))
    }
}

impl Renderer for OcClient {
    fn render(&self, file: &Path, params: &TemplateParams) -> Result<Vec<u8>> {
        let template_error = |message: String| Error::TemplateProcessing {
            file: file_name(file),
            message,
        };

        let declares_namespace = declares_namespace_param(file)?;
        let param_files = param_files_for(file, params);
        let args = process_args(file, params, declares_namespace, &param_files);
        let output = self.run(&args).map_err(|e| template_error(self.spawn_error(e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(template_error(stderr.trim().to_string()));
        }
        if !stderr.trim().is_empty() {
            warn!(file = %file.display(), "{}", stderr.trim());
        }

        debug!(file = %file.display(), "processed template");
        Ok(output.stdout)
    }
}

/// Arguments for `oc export`.
pub(crate) fn export_args(filter: &ResourceFilter, namespace: &str) -> Vec<String> {
    let mut args = vec![
        "export".to_string(),
        filter.convert_to_target(),
        "--output=yaml".to_string(),
        "--as-template=tailor".to_string(),
    ];
    if !namespace.is_empty() {
        args.push(format!("--namespace={}", namespace));
    }
    if let Some(label) = &filter.label {
        args.push(format!("--selector={}", label));
    }
    args
}

/// Arguments for `oc process`.
pub(crate) fn process_args(
    file: &Path,
    params: &TemplateParams,
    declares_namespace: bool,
    param_files: &[PathBuf],
) -> Vec<String> {
    let mut args = vec![
        "process".to_string(),
        format!("--filename={}", file.display()),
        "--output=yaml".to_string(),
    ];
    if let Some(labels) = params.labels.as_deref().filter(|l| !l.is_empty()) {
        args.push(format!("--labels={}", labels));
    }
    for param in &params.params {
        args.push(format!("--param={}", param));
    }
    if declares_namespace {
        args.push(format!("--param={}={}", NAMESPACE_PARAM, params.namespace));
    }
    for param_file in param_files {
        args.push(format!("--param-file={}", param_file.display()));
    }
    if params.ignore_unknown_parameters {
        args.push("--ignore-unknown-parameters=true".to_string());
    }
    args
}

/// Returns the param files to use for a template. Without explicit param files,
/// "<stem>.env" is looked up in the param dir. When no param dir is set, a
/// directory named after the namespace is preferred over the current one.
pub(crate) fn param_files_for(file: &Path, params: &TemplateParams) -> Vec<PathBuf> {
    if !params.param_files.is_empty() {
        return params.param_files.clone();
    }
    let dir = match &params.param_dir {
        Some(dir) if dir.as_os_str() != "." => dir.clone(),
        _ if !params.namespace.is_empty() && Path::new(&params.namespace).is_dir() => {
            PathBuf::from(&params.namespace)
        }
        _ => PathBuf::from("."),
    };
    let Some(stem) = file.file_stem() else {
        return Vec::new();
    };
    let candidate = dir.join(format!("{}.env", stem.to_string_lossy()));
    debug!(path = %candidate.display(), "looking for param file");
    if candidate.is_file() {
        vec![candidate]
    } else {
        Vec::new()
    }
}

/// Returns true if the template lists TAILOR_NAMESPACE among its parameters.
/// Unreadable files are left to `oc` to report.
pub(crate) fn declares_namespace_param(file: &Path) -> Result<bool> {
    let Ok(content) = fs::read(file) else {
        return Ok(false);
    };
    let documents = parse_documents(&content)?;
    Ok(documents
        .iter()
        .filter_map(|doc| doc.as_map()?.get("parameters")?.as_list())
        .flatten()
        .filter_map(|param| param.as_map()?.get("name")?.as_str())
        .any(|name| name.trim() == NAMESPACE_PARAM))
}

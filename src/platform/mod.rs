//! Collaborators providing the documents the comparison works on.
//!
//! The current state comes from an [`Exporter`], the desired state from a
//! [`Renderer`] processing template files. [`OcClient`] implements both with
//! the `oc` binary; [`FileExporter`] and [`RenderedFiles`] read documents that
//! were produced ahead of time.

mod export;
mod file;
mod oc;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::resource::{ResourceFilter, ResourceList};

pub use export::export_as_template;
pub use file::{expand_template_files, FileExporter, RenderedFiles};
pub use oc::OcClient;

/// Export is the outcome of exporting resources from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// YAML document listing the exported resources.
    Document(Vec<u8>),
    /// The platform holds no resource matching the filter.
    NoResourcesFound,
}

/// Exporter reads the current state of a namespace.
pub trait Exporter {
    fn export(&self, filter: &ResourceFilter, namespace: &str) -> Result<Export>;
}

/// Renderer turns a template file into the resources it declares.
pub trait Renderer {
    fn render(&self, file: &Path, params: &TemplateParams) -> Result<Vec<u8>>;
}

impl<T: Exporter + ?Sized> Exporter for &T {
    fn export(&self, filter: &ResourceFilter, namespace: &str) -> Result<Export> {
        (**self).export(filter, namespace)
    }
}

impl<T: Renderer + ?Sized> Renderer for &T {
    fn render(&self, file: &Path, params: &TemplateParams) -> Result<Vec<u8>> {
        (**self).render(file, params)
    }
}

/// TemplateParams are the inputs for processing a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams {
    /// Namespace the template is processed for; passed as TAILOR_NAMESPACE
    /// when the template declares that parameter.
    pub namespace: String,
    /// Labels set on every object, as "key=value".
    pub labels: Option<String>,
    /// Parameters as "NAME=value".
    pub params: Vec<String>,
    pub param_files: Vec<PathBuf>,
    /// Directory searched for "<template stem>.env" when no param files are given.
    pub param_dir: Option<PathBuf>,
    pub ignore_unknown_parameters: bool,
}

/// Builds the current state from an export.
///
/// A "no resources found" export is an empty list. Exporter failures are
/// reported with the kinds that were exported.
pub fn assemble_platform_list<E: Exporter + ?Sized>(
    exporter: &E,
    filter: &ResourceFilter,
    namespace: &str,
) -> Result<ResourceList> {
    let target = filter.convert_to_target();
    let export = exporter.export(filter, namespace).map_err(|err| match err {
        Error::Export { .. } => err,
        other => Error::Export {
            target: target.clone(),
            message: other.to_string(),
        },
    })?;
    match export {
        Export::NoResourcesFound => {
            debug!(target = %target, "no resources found");
            ResourceList::from_platform(filter, &[])
        }
        Export::Document(document) => {
            debug!(target = %target, bytes = document.len(), "exported resources");
            ResourceList::from_platform(filter, &document)
        }
    }
}

/// Builds the desired state by rendering every template file, in order.
///
/// Renderer failures are reported with the name of the template file.
pub fn assemble_template_list<R: Renderer + ?Sized>(
    renderer: &R,
    filter: &ResourceFilter,
    files: &[PathBuf],
    params: &TemplateParams,
) -> Result<ResourceList> {
    let mut inputs = Vec::with_capacity(files.len());
    for file in files {
        debug!(file = %file.display(), "processing template");
        let rendered = renderer.render(file, params).map_err(|err| match err {
            Error::TemplateProcessing { .. } => err,
            other => Error::TemplateProcessing {
                file: file_name(file),
                message: other.to_string(),
            },
        })?;
        inputs.push(rendered);
    }
    ResourceList::from_templates(filter, &inputs)
}

pub(crate) fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeExporter {
        result: fn() -> Result<Export>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl Exporter for FakeExporter {
        fn export(&self, filter: &ResourceFilter, namespace: &str) -> Result<Export> {
            self.calls
                .borrow_mut()
                .push((filter.convert_to_target(), namespace.to_string()));
            (self.result)()
        }
    }

    struct FakeRenderer;

    impl Renderer for FakeRenderer {
        fn render(&self, file: &Path, _params: &TemplateParams) -> Result<Vec<u8>> {
            match file_name(file).as_str() {
                "broken.yml" => Err(Error::io(file, std::io::Error::other("boom"))),
                name => Ok(format!(
                    "kind: List\nitems:\n- kind: ConfigMap\n  metadata:\n    name: {}\n",
                    name.trim_end_matches(".yml")
                )
                .into_bytes()),
            }
        }
    }

    #[test]
    fn test_platform_list_no_resources_found() {
        let exporter = FakeExporter {
            result: || Ok(Export::NoResourcesFound),
            calls: RefCell::new(Vec::new()),
        };
        let filter = ResourceFilter::new("cm", "", "").unwrap();

        let list = assemble_platform_list(&exporter, &filter, "demo").unwrap();

        assert!(list.is_empty());
        assert_eq!(
            exporter.calls.borrow().as_slice(),
            &[("ConfigMap".to_string(), "demo".to_string())]
        );
    }

    #[test]
    fn test_platform_list_from_document() {
        let exporter = FakeExporter {
            result: || {
                Ok(Export::Document(
                    b"kind: Template\nobjects:\n- kind: ConfigMap\n  metadata:\n    name: foo\n".to_vec(),
                ))
            },
            calls: RefCell::new(Vec::new()),
        };
        let list = assemble_platform_list(&exporter, &ResourceFilter::default(), "demo").unwrap();
        assert!(list.contains("ConfigMap", "foo"));
    }

    #[test]
    fn test_platform_list_wraps_errors() {
        let exporter = FakeExporter {
            result: || Err(Error::Config { message: "unreachable".into() }),
            calls: RefCell::new(Vec::new()),
        };
        let filter = ResourceFilter::new("dc,svc", "", "").unwrap();

        match assemble_platform_list(&exporter, &filter, "demo") {
            Err(Error::Export { target, message }) => {
                assert_eq!(target, "DeploymentConfig,Service");
                assert!(message.contains("unreachable"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_template_list_in_file_order() {
        let files = vec![PathBuf::from("t/b.yml"), PathBuf::from("t/a.yml")];
        let list = assemble_template_list(
            &FakeRenderer,
            &ResourceFilter::default(),
            &files,
            &TemplateParams::default(),
        )
        .unwrap();

        let names: Vec<&str> = list.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_template_list_names_failing_file() {
        let files = vec![PathBuf::from("t/a.yml"), PathBuf::from("t/broken.yml")];
        let err = assemble_template_list(
            &FakeRenderer,
            &ResourceFilter::default(),
            &files,
            &TemplateParams::default(),
        )
        .unwrap_err();

        match err {
            Error::TemplateProcessing { file, .. } => assert_eq!(file, "broken.yml"),
            other => panic!("unexpected error: {}", other),
        }
    }
}

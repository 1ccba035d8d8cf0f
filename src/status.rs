//! Drift between the templates and a namespace.
//!
//! [`calculate_changeset`] builds the desired and the current state, then compares
//! them; [`report`] prints the outcome the way `tailor status` shows it.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use console::style;
use tracing::{debug, info_span};

use crate::config::{CompareOptions, DiffFormat};
use crate::diff::{parse_ignore_paths, Changeset};
use crate::error::Result;
use crate::platform::{
    assemble_platform_list, assemble_template_list, expand_template_files, Exporter, Renderer,
};

/// Status is the outcome of comparing templates with a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The templates declare no resources and the comparison was not forced.
    Refused {
        current: usize,
        desired: usize,
        message: String,
    },
    Compared {
        /// Number of resources on the platform.
        current: usize,
        /// Number of resources in the processed templates.
        desired: usize,
        changeset: Changeset,
    },
}

impl Status {
    /// Returns true if something has to be created, updated or deleted.
    pub fn has_drift(&self) -> bool {
        match self {
            Status::Refused { .. } => false,
            Status::Compared { changeset, .. } => !changeset.is_blank(),
        }
    }

    pub fn changeset(&self) -> Option<&Changeset> {
        match self {
            Status::Refused { .. } => None,
            Status::Compared { changeset, .. } => Some(changeset),
        }
    }
}

/// Compares the processed templates with the resources in the namespace.
///
/// The export runs on its own thread while the templates are processed. Without
/// `force`, an empty desired state is refused, since comparing it would delete
/// everything in scope.
pub fn calculate_changeset<E, R>(options: &CompareOptions, exporter: &E, renderer: &R) -> Result<Status>
where
    E: Exporter + Sync + ?Sized,
    R: Renderer + ?Sized,
{
    let _span = info_span!("status", namespace = %options.namespace).entered();

    let filter = options.filter()?;
    let ignore_paths = parse_ignore_paths(&options.ignore_paths)?;
    let templates = if options.template_files.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        options.template_files.clone()
    };
    let files = expand_template_files(&templates)?;
    let params = options.template_params();
    debug!(filter = %filter, files = files.len(), "comparing");

    let (current, desired) = thread::scope(|scope| {
        let export = scope.spawn(|| assemble_platform_list(exporter, &filter, &options.namespace));
        let desired = assemble_template_list(renderer, &filter, &files, &params);
        let current = match export.join() {
            Ok(current) => current,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        (current, desired)
    });
    let (current, desired) = (current?, desired?);
    debug!(current = current.len(), desired = desired.len(), "assembled resource lists");

    if desired.is_empty() && !options.force {
        return Ok(Status::Refused {
            current: current.len(),
            desired: desired.len(),
            message: refusal(options, &templates),
        });
    }

    let changeset = Changeset::with_ignore_paths(&current, &desired, options.upsert_only, &ignore_paths)?;
    Ok(Status::Compared {
        current: current.len(),
        desired: desired.len(),
        changeset,
    })
}

fn refusal(options: &CompareOptions, templates: &[PathBuf]) -> String {
    let location = templates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let mut message = String::from("No items were found in desired state. ");
    if options.resource.is_empty() && options.selector.is_empty() {
        message.push_str(&format!("Are there any templates in {}?\n", location));
    } else {
        message.push_str(&format!("Possible reasons are:\n* No templates are located in {}\n", location));
        if !options.resource.is_empty() {
            message.push_str(&format!("* No templates contain resources of kinds: {}\n", options.resource));
        }
        if !options.selector.is_empty() {
            message.push_str(&format!(
                "* No templates contain resources matching selector: {}\n",
                options.selector
            ));
        }
    }
    message.push_str("\nRefusing to continue without --force");
    message
}

/// Writes a status report.
///
/// Updates show the diff for [`DiffFormat::Text`] and the patch operations for
/// [`DiffFormat::Json`].
pub fn report(status: &Status, format: DiffFormat, writer: &mut dyn Write) -> io::Result<()> {
    let (current, desired) = match status {
        Status::Refused { current, desired, .. } | Status::Compared { current, desired, .. } => {
            (*current, *desired)
        }
    };
    writeln!(
        writer,
        "Found {} in OCP cluster (current state) and {} in processed templates (desired state).\n",
        resources(current),
        resources(desired)
    )?;

    match status {
        Status::Refused { message, .. } => writeln!(writer, "{}", message),
        Status::Compared { changeset, .. } => report_changeset(changeset, format, writer),
    }
}

/// Writes every change followed by a summary line.
pub fn report_changeset(changeset: &Changeset, format: DiffFormat, writer: &mut dyn Write) -> io::Result<()> {
    for change in &changeset.noop {
        writeln!(writer, "* {} is in sync", change.item_name())?;
    }

    for change in &changeset.delete {
        writeln!(writer, "{}", style(format!("- {} to delete", change.item_name())).red())?;
        write!(writer, "{}", change.diff())?;
    }

    for change in &changeset.create {
        writeln!(writer, "{}", style(format!("+ {} to create", change.item_name())).green())?;
        write!(writer, "{}", change.diff())?;
    }

    for change in &changeset.update {
        writeln!(writer, "{}", style(format!("~ {} to update", change.item_name())).yellow())?;
        match format {
            DiffFormat::Text => write!(writer, "{}", change.diff())?,
            DiffFormat::Json => writeln!(writer, "{}", change.json_patches(true))?,
        }
    }

    let summary = changeset.summary();
    writeln!(
        writer,
        "\nSummary: {} in sync, {}, {}, {}\n",
        summary.noop,
        style(format!("{} to create", summary.create)).green(),
        style(format!("{} to update", summary.update)).yellow(),
        style(format!("{} to delete", summary.delete)).red()
    )
}

fn resources(count: usize) -> String {
    if count == 1 {
        "1 resource".to_string()
    } else {
        format!("{} resources", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::platform::{Export, TemplateParams};
    use crate::resource::ResourceFilter;
    use std::path::Path;

    const TEMPLATE: &str = "kind: Template\nobjects:\n- kind: ConfigMap\n  metadata:\n    name: foo\n    labels:\n      app: foo\n  data:\n    bar: qux\n- kind: Service\n  metadata:\n    name: foo\n    labels:\n      app: foo\n";

    const EXPORT: &str = "kind: Template\nobjects:\n- kind: ConfigMap\n  metadata:\n    name: foo\n    labels:\n      app: foo\n  data:\n    bar: baz\n- kind: Route\n  metadata:\n    name: old\n    labels:\n      app: foo\n";

    struct Cluster(Option<&'static str>);

    impl Exporter for Cluster {
        fn export(&self, _filter: &ResourceFilter, _namespace: &str) -> Result<Export> {
            Ok(match self.0 {
                Some(document) => Export::Document(document.as_bytes().to_vec()),
                None => Export::NoResourcesFound,
            })
        }
    }

    struct Templates(&'static str);

    impl Renderer for Templates {
        fn render(&self, _file: &Path, _params: &TemplateParams) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    fn options() -> CompareOptions {
        CompareOptions {
            namespace: "demo".into(),
            template_files: vec![PathBuf::from("cm.yml")],
            ..Default::default()
        }
    }

    fn render(status: &Status, format: DiffFormat) -> String {
        let mut out = Vec::new();
        report(status, format, &mut out).unwrap();
        console::strip_ansi_codes(&String::from_utf8(out).unwrap()).into_owned()
    }

    #[test]
    fn test_drift() {
        let status = calculate_changeset(&options(), &Cluster(Some(EXPORT)), &Templates(TEMPLATE)).unwrap();

        assert!(status.has_drift());
        let changeset = status.changeset().unwrap();
        assert_eq!(changeset.summary().to_string(), "0 in sync, 1 to create, 1 to update, 1 to delete");

        let text = render(&status, DiffFormat::Text);
        assert!(text.starts_with(
            "Found 2 resources in OCP cluster (current state) and 2 resources in processed templates (desired state).\n"
        ));
        assert!(text.contains("- Route/old to delete\n"));
        assert!(text.contains("+ Service/foo to create\n"));
        assert!(text.contains("~ ConfigMap/foo to update\n"));
        assert!(text.contains("+  bar: qux"));
        assert!(text.contains("Summary: 0 in sync, 1 to create, 1 to update, 1 to delete"));

        let json = render(&status, DiffFormat::Json);
        assert!(json.contains("\"path\": \"/data/bar\""));
    }

    #[test]
    fn test_upsert_only_and_ignore_paths() {
        let options = CompareOptions {
            upsert_only: true,
            ignore_paths: vec!["cm:/data/bar".into()],
            ..options()
        };
        let status = calculate_changeset(&options, &Cluster(Some(EXPORT)), &Templates(TEMPLATE)).unwrap();

        let changeset = status.changeset().unwrap();
        assert_eq!(changeset.summary().to_string(), "1 in sync, 1 to create, 0 to update, 0 to delete");
        assert!(render(&status, DiffFormat::Text).contains("* ConfigMap/foo is in sync\n"));
    }

    #[test]
    fn test_no_drift() {
        let status = calculate_changeset(&options(), &Cluster(Some(TEMPLATE)), &Templates(TEMPLATE)).unwrap();
        assert!(!status.has_drift());
        assert!(render(&status, DiffFormat::Text).contains("Summary: 2 in sync, 0 to create, 0 to update, 0 to delete"));
    }

    #[test]
    fn test_refuses_empty_desired_state() {
        let options = CompareOptions {
            selector: "app=bar".into(),
            ..options()
        };
        let status = calculate_changeset(&options, &Cluster(Some(EXPORT)), &Templates(TEMPLATE)).unwrap();

        assert!(!status.has_drift());
        assert!(matches!(status, Status::Refused { current: 0, desired: 0, .. }));
        let text = render(&status, DiffFormat::Text);
        assert!(text.starts_with(
            "Found 0 resources in OCP cluster (current state) and 0 resources in processed templates (desired state).\n\nNo items were found in desired state. "
        ));
        assert!(text.contains("* No templates contain resources matching selector: app=bar"));
        assert!(text.contains("Refusing to continue without --force"));

        let forced = CompareOptions { force: true, ..options };
        let status = calculate_changeset(&forced, &Cluster(None), &Templates(TEMPLATE)).unwrap();
        assert!(!status.has_drift());
        assert_eq!(status.changeset().unwrap().summary().to_string(), "0 in sync, 0 to create, 0 to update, 0 to delete");
    }

    #[test]
    fn test_refusal_reports_counts() {
        let status = calculate_changeset(&options(), &Cluster(Some(EXPORT)), &Templates("")).unwrap();

        assert!(matches!(status, Status::Refused { current: 2, desired: 0, .. }));
        assert_eq!(
            render(&status, DiffFormat::Text),
            "Found 2 resources in OCP cluster (current state) and 0 resources in processed templates (desired state).\n\n\
             No items were found in desired state. Are there any templates in cm.yml?\n\n\
             Refusing to continue without --force\n"
        );
    }

    #[test]
    fn test_invalid_ignore_path_fails_before_export() {
        struct Unreachable;
        impl Exporter for Unreachable {
            fn export(&self, _filter: &ResourceFilter, _namespace: &str) -> Result<Export> {
                panic!("export must not run");
            }
        }

        let options = CompareOptions {
            ignore_paths: vec!["spec.replicas".into()],
            ..options()
        };
        let result = calculate_changeset(&options, &Unreachable, &Templates(TEMPLATE));
        assert!(matches!(result, Err(Error::InvalidPath { .. })));
    }
}

//! tailor - compare OpenShift templates with the state of a namespace
//!
//! Exit status of `tailor status`: 0 when the namespace matches the templates,
//! 3 when there is drift, 1 on errors.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tailor::config::{CompareOptions, DiffFormat};
use tailor::platform::{export_as_template, Exporter, FileExporter, OcClient, Renderer, RenderedFiles};
use tailor::status::{calculate_changeset, report};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_DRIFT: u8 = 3;

/// Options file picked up from the working directory when --options-file is not given.
const DEFAULT_OPTIONS_FILE: &str = "Tailorfile";

#[derive(Parser)]
#[command(name = "tailor")]
#[command(version)]
#[command(about = "Keep OpenShift templates and the state of a namespace in sync", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML file with default options
    #[arg(long, global = true)]
    options_file: Option<PathBuf>,

    /// Namespace to compare with
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Read the current state from an exported file instead of running oc
    #[arg(long, global = true)]
    from_export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the drift between the templates and the namespace
    Status(StatusArgs),

    /// Export resources of the namespace as a template
    Export(ScopeArgs),
}

#[derive(Args)]
struct ScopeArgs {
    /// Kinds ("dc,svc") or a single "kind/name" to limit the comparison to
    resource: Option<String>,

    /// Label selector (key=value)
    #[arg(short = 'l', long)]
    selector: Option<String>,

    /// Kinds, Kind/Name or key=value labels to exclude (comma separated)
    #[arg(long)]
    exclude: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    #[command(flatten)]
    scope: ScopeArgs,

    /// Template files or directories (default: current directory)
    #[arg(short = 't', long = "template-file")]
    template_files: Vec<PathBuf>,

    /// Param files passed to the template processing
    #[arg(long = "param-file")]
    param_files: Vec<PathBuf>,

    /// Directory holding <template>.env param files
    #[arg(long)]
    param_dir: Option<PathBuf>,

    /// Template parameters (NAME=value)
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,

    /// Labels set on all processed objects
    #[arg(long)]
    labels: Option<String>,

    /// Ignore parameters the template does not declare
    #[arg(long)]
    ignore_unknown_parameters: bool,

    /// Never delete resources missing from the templates
    #[arg(long)]
    upsert_only: bool,

    /// Continue even if the templates declare no resources
    #[arg(long)]
    force: bool,

    /// Pointers excluded from the comparison ([kind:[name:]]/path)
    #[arg(long = "ignore-path")]
    ignore_paths: Vec<String>,

    /// Use the templates as they are instead of processing them with oc
    #[arg(long)]
    rendered: bool,

    /// How updates are shown
    #[arg(long, value_enum)]
    diff: Option<DiffFormat>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tailor=debug" } else { "warn" };
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    let file_options = load_options(cli.options_file.as_deref())?;
    let exporter: Box<dyn Exporter + Sync> = match &cli.from_export {
        Some(path) => Box::new(FileExporter::new(path)),
        None => Box::new(OcClient::new()),
    };

    match cli.command {
        Command::Status(args) => {
            let rendered = args.rendered;
            let mut cli_options = args.into_options();
            cli_options.namespace = cli.namespace.unwrap_or_default();
            let options = file_options.merge_cli(cli_options);

            let renderer: Box<dyn Renderer> = if rendered {
                Box::new(RenderedFiles)
            } else {
                Box::new(OcClient::new())
            };

            let status = calculate_changeset(&options, exporter.as_ref(), renderer.as_ref())?;
            let mut stdout = io::stdout().lock();
            report(&status, options.diff_format(), &mut stdout)?;
            stdout.flush()?;

            Ok(if status.has_drift() { EXIT_DRIFT } else { EXIT_SUCCESS })
        }
        Command::Export(scope) => {
            let cli_options = CompareOptions {
                namespace: cli.namespace.unwrap_or_default(),
                ..scope.into_options()
            };
            let options = file_options.merge_cli(cli_options);

            let template = export_as_template(exporter.as_ref(), &options.filter()?, &options.namespace)?;
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", template)?;
            stdout.flush()?;

            Ok(EXIT_SUCCESS)
        }
    }
}

fn load_options(path: Option<&Path>) -> tailor::Result<CompareOptions> {
    match path {
        Some(path) => CompareOptions::from_file(path),
        None if Path::new(DEFAULT_OPTIONS_FILE).is_file() => CompareOptions::from_file(DEFAULT_OPTIONS_FILE),
        None => Ok(CompareOptions::default()),
    }
}

impl ScopeArgs {
    fn into_options(self) -> CompareOptions {
        CompareOptions {
            resource: self.resource.unwrap_or_default(),
            selector: self.selector.unwrap_or_default(),
            exclude: self.exclude.unwrap_or_default(),
            ..Default::default()
        }
    }
}

impl StatusArgs {
    fn into_options(self) -> CompareOptions {
        CompareOptions {
            template_files: self.template_files,
            param_files: self.param_files,
            param_dir: self.param_dir,
            params: self.params,
            labels: self.labels,
            ignore_unknown_parameters: self.ignore_unknown_parameters,
            upsert_only: self.upsert_only,
            force: self.force,
            ignore_paths: self.ignore_paths,
            diff: self.diff,
            ..self.scope.into_options()
        }
    }
}

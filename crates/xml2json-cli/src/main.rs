use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use xml2json::{
    ConvertConfig, ConvertOptions, JsonConfig, OutputTarget, XmlConfig, convert_dir, convert_file,
};

#[derive(Debug, Parser)]
#[command(
    name = "xml2json",
    version,
    about = "Convert XML documents to JSON",
    after_help = "Examples:\n  xml2json input.xml\n  xml2json input.xml output.json\n  xml2json input.xml - --compact\n  xml2json -d ./xml_files --output-dir ./json_files"
)]
struct Args {
    /// Input XML file, or directory with --directory
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
    /// Output JSON file, `-` for stdout (defaults to INPUT with a .json extension)
    #[arg(value_name = "OUTPUT")]
    output: Option<String>,
    /// Convert every .xml file in the INPUT directory
    #[arg(short, long)]
    directory: bool,
    /// Directory for batch output (defaults to the input directory)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Don't wrap the result in an object keyed by the root element
    #[arg(long)]
    no_root: bool,
    /// Write compact JSON instead of pretty-printing
    #[arg(long)]
    compact: bool,
    /// Drop namespace URIs from element and attribute keys
    #[arg(long)]
    strip_namespaces: bool,
    /// Drop text that sits next to attributes or child elements
    #[arg(long)]
    no_mixed_content: bool,
    /// Represent empty elements as null instead of {}
    #[arg(long)]
    empty_as_null: bool,
    /// Escape non-ASCII characters in the JSON output
    #[arg(long)]
    ensure_ascii: bool,
    /// Maximum element nesting depth (0 = unlimited)
    #[arg(long, value_name = "N", default_value_t = XmlConfig::default().max_depth)]
    max_depth: u16,
    /// Worker threads for directory mode (defaults to one per CPU)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn options(&self) -> ConvertOptions {
        let mut json = if self.compact {
            JsonConfig::compact()
        } else {
            JsonConfig::default()
        };
        json.ensure_ascii = self.ensure_ascii;

        ConvertOptions {
            xml: XmlConfig {
                max_depth: self.max_depth,
                ..XmlConfig::default()
            },
            convert: ConvertConfig {
                preserve_root: !self.no_root,
                strip_namespaces: self.strip_namespaces,
                preserve_mixed_content: !self.no_mixed_content,
                empty_as_null: self.empty_as_null,
            },
            json,
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level());

    let Some(input) = args.input.clone() else {
        if let Err(err) = Args::command().print_help() {
            error!("failed to print help: {err}");
        }
        return ExitCode::FAILURE;
    };

    match run(&args, &input) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Returns whether every requested conversion succeeded
fn run(args: &Args, input: &Path) -> Result<bool> {
    let options = args.options();

    if args.directory {
        if args.output.is_some() {
            warn!("OUTPUT is ignored in directory mode, use --output-dir");
        }
        return run_batch(input, args.output_dir.as_deref(), args.jobs, &options);
    }

    let target = OutputTarget::from_arg(args.output.as_deref());
    convert_file(input, &target, &options)
        .with_context(|| format!("failed to convert {}", input.display()))?;
    Ok(true)
}

fn run_batch(
    input: &Path,
    output_dir: Option<&Path>,
    jobs: Option<usize>,
    options: &ConvertOptions,
) -> Result<bool> {
    let report = match jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to start worker pool")?;
            info!("using {} worker thread(s)", pool.current_num_threads());
            pool.install(|| convert_dir(input, output_dir, options))
        }
        None => convert_dir(input, output_dir, options),
    }
    .with_context(|| format!("failed to convert directory {}", input.display()))?;

    for outcome in report.failed() {
        warn!("not converted: {}", outcome.input.display());
    }
    Ok(report.is_success())
}

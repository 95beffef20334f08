//! Single file conversion

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::convert::{ConvertOptions, xml_to_json_with_options};
use crate::input::Input;

/// Failure converting a file or directory
#[derive(Error, Debug)]
pub enum FileError {
    #[error("input file '{}' does not exist", path.display())]
    NotFound { path: PathBuf },
    #[error("'{}' is not a regular file", path.display())]
    NotAFile { path: PathBuf },
    #[error("'{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("no XML files found in directory '{}'", path.display())]
    NoXmlFiles { path: PathBuf },
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "'{}' would overwrite the output of '{}' at '{}'",
        path.display(),
        owner.display(),
        output.display()
    )]
    OutputConflict {
        path: PathBuf,
        owner: PathBuf,
        output: PathBuf,
    },
    #[error("error parsing XML file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: crate::Error,
    },
}

/// Where converted JSON goes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Next to the input, with a `.json` extension
    #[default]
    Auto,
    Stdout,
    Path(PathBuf),
}

impl OutputTarget {
    /// Interpret a command-line output argument: none, `-`, or a path
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => Self::Auto,
            Some("-") => Self::Stdout,
            Some(path) => Self::Path(PathBuf::from(path)),
        }
    }

    /// Destination file, if the target is a file
    pub fn resolve(&self, input: &Path) -> Option<PathBuf> {
        match self {
            Self::Auto => Some(input.with_extension("json")),
            Self::Stdout => None,
            Self::Path(path) => Some(path.clone()),
        }
    }
}

/// Summary of one successful conversion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    pub input: PathBuf,
    /// `None` when written to stdout
    pub output: Option<PathBuf>,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Whether `path` has an `.xml` extension, ignoring case
pub fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Read and convert `input` without writing anything
pub fn convert_path(input: &Path, options: &ConvertOptions) -> Result<String, FileError> {
    let metadata = fs::metadata(input).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FileError::NotFound {
            path: input.to_path_buf(),
        },
        _ => FileError::Read {
            path: input.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_file() {
        return Err(FileError::NotAFile {
            path: input.to_path_buf(),
        });
    }
    if !has_xml_extension(input) {
        warn!("input file '{}' doesn't have .xml extension", input.display());
    }

    let bytes = fs::read(input).map_err(|source| FileError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let name = input.to_string_lossy();
    let source = Input::from_bytes(&bytes).with_filename(&name);

    xml_to_json_with_options(source, options).map_err(|source| FileError::Parse {
        path: input.to_path_buf(),
        source,
    })
}

/// Convert `input` and write the JSON to `target`
#[instrument(skip_all, fields(input = %input.display()))]
pub fn convert_file(
    input: &Path,
    target: &OutputTarget,
    options: &ConvertOptions,
) -> Result<FileReport, FileError> {
    info!("parsing XML file: {}", input.display());
    let json = convert_path(input, options)?;
    let input_bytes = fs::metadata(input).map(|m| m.len()).unwrap_or_default();
    let output_bytes = u64::try_from(json.len()).unwrap_or(u64::MAX);

    let output = match target.resolve(input) {
        Some(path) => {
            write_json(&path, &json)?;
            info!(
                "successfully converted '{}' to '{}'",
                input.display(),
                path.display()
            );
            info!("input size: {input_bytes} bytes, output size: {output_bytes} bytes");
            Some(path)
        }
        None => {
            write_stdout(&json)?;
            debug!("JSON output written to stdout");
            None
        }
    };

    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        input_bytes,
        output_bytes,
    })
}

fn write_json(path: &Path, json: &str) -> Result<(), FileError> {
    let write_error = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, json).map_err(write_error)
}

fn write_stdout(json: &str) -> Result<(), FileError> {
    let write_error = |source| FileError::Write {
        path: PathBuf::from("<stdout>"),
        source,
    };
    let mut stdout = io::stdout().lock();
    stdout.write_all(json.as_bytes()).map_err(write_error)?;
    if !json.ends_with('\n') {
        stdout.write_all(b"\n").map_err(write_error)?;
    }
    stdout.flush().map_err(write_error)
}

//! Directory (batch) conversion
//!
//! Every XML file directly inside a directory is converted independently on a
//! rayon worker pool. A file that fails is recorded in the report and never
//! stops its siblings.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, instrument};

use crate::convert::ConvertOptions;
use crate::file::{FileError, FileReport, OutputTarget, convert_file, has_xml_extension};

/// Result of converting one file of a batch
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<FileReport, FileError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-file outcomes of a batch, in input path order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Number of files converted successfully
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Outcomes that failed
    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// True when every file converted
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.total()
    }
}

/// XML files directly inside `dir`, sorted by path
pub fn find_xml_files(dir: &Path) -> Result<Vec<PathBuf>, FileError> {
    let metadata = fs::metadata(dir).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FileError::NotFound {
            path: dir.to_path_buf(),
        },
        _ => FileError::Read {
            path: dir.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let read_error = |source| FileError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if has_xml_extension(&path) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Convert every XML file in `input_dir`, writing `<stem>.json` files into
/// `output_dir` (defaults to `input_dir`)
///
/// Files whose stems differ only in extension case share an output path;
/// only the first of them in path order is converted, the rest fail with
/// [`FileError::OutputConflict`].
#[instrument(skip_all, fields(dir = %input_dir.display()))]
pub fn convert_dir(
    input_dir: &Path,
    output_dir: Option<&Path>,
    options: &ConvertOptions,
) -> Result<BatchReport, FileError> {
    let files = find_xml_files(input_dir)?;
    if files.is_empty() {
        return Err(FileError::NoXmlFiles {
            path: input_dir.to_path_buf(),
        });
    }
    info!("found {} XML file(s) to convert", files.len());

    let output_dir = output_dir.unwrap_or(input_dir);
    let jobs: Vec<(PathBuf, PathBuf)> = files
        .into_iter()
        .map(|input| {
            let output = output_path(&input, output_dir);
            (input, output)
        })
        .collect();

    // the first input in path order owns each output file
    let mut owners: HashMap<&Path, &Path> = HashMap::with_capacity(jobs.len());
    for (input, output) in &jobs {
        owners.entry(output.as_path()).or_insert(input.as_path());
    }

    let outcomes: Vec<FileOutcome> = jobs
        .par_iter()
        .map(|(input, output)| {
            let result = match owners.get(output.as_path()) {
                Some(&owner) if owner != input.as_path() => Err(FileError::OutputConflict {
                    path: input.clone(),
                    owner: owner.to_path_buf(),
                    output: output.clone(),
                }),
                _ => {
                    info!("converting: {}", input.display());
                    convert_file(input, &OutputTarget::Path(output.clone()), options)
                }
            };
            if let Err(err) = &result {
                error!("{err}");
            }
            FileOutcome {
                input: input.clone(),
                output: output.clone(),
                result,
            }
        })
        .collect();

    let report = BatchReport { outcomes };
    info!(
        "batch conversion completed: {}/{} file(s) converted successfully",
        report.succeeded(),
        report.total()
    );
    Ok(report)
}

/// `<output_dir>/<stem>.json`
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push(".json");
    output_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("in/feed.v2.XML"), Path::new("out")),
            PathBuf::from("out/feed.v2.json")
        );
    }

    #[test]
    fn test_report_counts() {
        let ok = FileOutcome {
            input: PathBuf::from("a.xml"),
            output: PathBuf::from("a.json"),
            result: Ok(FileReport {
                input: PathBuf::from("a.xml"),
                output: Some(PathBuf::from("a.json")),
                input_bytes: 4,
                output_bytes: 12,
            }),
        };
        let failed = FileOutcome {
            input: PathBuf::from("b.xml"),
            output: PathBuf::from("b.json"),
            result: Err(FileError::NotFound {
                path: PathBuf::from("b.xml"),
            }),
        };
        let report = BatchReport {
            outcomes: vec![ok, failed],
        };

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_missing_directory() {
        let result = convert_dir(Path::new("no/such/dir"), None, &ConvertOptions::default());
        assert!(matches!(result, Err(FileError::NotFound { .. })));
    }
}

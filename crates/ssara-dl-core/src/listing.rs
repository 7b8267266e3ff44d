//! Expected file listing from the downloader's list-only (`--print`) mode.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

use crate::process::exit_code;
use crate::template::DownloadOptions;

/// Flag asking the downloader to print matching scenes.
pub const PRINT_FLAG: &str = "--print";
/// Flag asking the downloader to fetch the matching scenes.
pub const DOWNLOAD_FLAG: &str = "--download";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} --print exited with code {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },
}

/// Basenames the downloader says it would fetch, deduplicated in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedFileSet {
    names: Vec<String>,
}

impl ExpectedFileSet {
    /// Parse `--print` output. Each scene line is comma-separated with the
    /// remote URL or path as its last field; banner and header lines (no
    /// comma, or a last field without a `/`) are skipped.
    pub fn from_listing(output: &str) -> Self {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for line in output.lines() {
            let Some((_, last)) = line.trim().rsplit_once(',') else {
                continue;
            };
            let last = last.trim();
            let Some((_, base)) = last.rsplit_once('/') else {
                continue;
            };
            if base.is_empty() {
                continue;
            }
            if seen.insert(base.to_string()) {
                names.push(base.to_string());
            }
        }
        Self { names }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExpectedFileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let names = iter
            .into_iter()
            .map(Into::into)
            .filter(|n: &String| seen.insert(n.clone()))
            .collect();
        Self { names }
    }
}

/// Source of the expected file set for a set of download options.
pub trait ListingSource: Send + Sync {
    fn expected_files(&self, options: &DownloadOptions) -> Result<ExpectedFileSet, ListingError>;
}

/// Runs `program <options> --print` and parses its stdout.
#[derive(Debug, Clone)]
pub struct SsaraListing {
    program: String,
    work_dir: PathBuf,
}

impl SsaraListing {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }
}

impl ListingSource for SsaraListing {
    fn expected_files(&self, options: &DownloadOptions) -> Result<ExpectedFileSet, ListingError> {
        let output = Command::new(&self.program)
            .args(options.args())
            .arg(PRINT_FLAG)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|source| ListingError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ListingError::Failed {
                program: self.program.clone(),
                code: exit_code(output.status),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(ExpectedFileSet::from_listing(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

//! Download options from a processing template.
//!
//! Templates are line-oriented `key = value` text. Only the download options
//! are read here: either a single `ssaraopt = <flags>` line, or a set of
//! dotted `ssaraopt.<flag> = <value>` lines assembled into `--<flag>=<value>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const OPTION_KEY: &str = "ssaraopt";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template {0} has no `ssaraopt` entry")]
    MissingOptions(PathBuf),
    #[error("template {0}: `ssaraopt` is empty")]
    EmptyOptions(PathBuf),
}

/// Parse `key = value` lines. Blank lines and `#` comments are skipped, and a
/// trailing ` #...` comment is stripped from the value.
pub fn parse_entries(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = match value.find(" #") {
            Some(idx) => &value[..idx],
            None => value,
        };
        entries.push((key.trim().to_string(), value.trim().to_string()));
    }
    entries
}

/// Flags passed verbatim to the external downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    args: Vec<String>,
}

impl DownloadOptions {
    /// Split a free-form option string on whitespace.
    pub fn parse(line: &str) -> Self {
        Self {
            args: line.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Extract options from parsed template entries. The last `ssaraopt` line
    /// wins; dotted keys are used only when no `ssaraopt` line exists.
    pub fn from_entries(entries: &[(String, String)]) -> Option<Self> {
        if let Some((_, value)) = entries.iter().rev().find(|(k, _)| k == OPTION_KEY) {
            return Some(Self::parse(value));
        }
        let prefix = format!("{OPTION_KEY}.");
        let args: Vec<String> = entries
            .iter()
            .filter_map(|(k, v)| {
                let flag = k.strip_prefix(&prefix)?;
                if flag.is_empty() || v.is_empty() {
                    return None;
                }
                Some(format!("--{flag}={v}"))
            })
            .collect();
        if args.is_empty() {
            None
        } else {
            Some(Self { args })
        }
    }

    /// Read and parse the template at `path`; fails fast on missing or empty options.
    pub fn from_template(path: &Path) -> Result<Self, TemplateError> {
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let opts = Self::from_entries(&parse_entries(&text))
            .ok_or_else(|| TemplateError::MissingOptions(path.to_path_buf()))?;
        if opts.is_empty() {
            return Err(TemplateError::EmptyOptions(path.to_path_buf()));
        }
        Ok(opts)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Same options with any `--parallel` setting forced to 1.
    pub fn for_serial(&self) -> Self {
        let mut args = Vec::with_capacity(self.args.len());
        let mut iter = self.args.iter();
        while let Some(arg) = iter.next() {
            if arg.starts_with("--parallel=") {
                args.push("--parallel=1".to_string());
            } else if arg == "--parallel" {
                args.push("--parallel=1".to_string());
                iter.next();
            } else {
                args.push(arg.clone());
            }
        }
        Self { args }
    }
}

impl std::fmt::Display for DownloadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Dataset name used in log lines: the template's file stem.
pub fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string())
}

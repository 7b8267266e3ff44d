use std::path::{Path, PathBuf};

use crate::listing::{DOWNLOAD_FLAG, PRINT_FLAG};
use crate::retry::Mode;
use crate::template::{dataset_name, DownloadOptions, TemplateError};

/// One dataset download: options from a template plus the launch count for the current pass.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub template: PathBuf,
    pub dataset: String,
    pub options: DownloadOptions,
    /// Launches already made in `mode`; starts at 0.
    pub attempt: u32,
    pub mode: Mode,
}

impl DownloadJob {
    pub fn new(template: impl Into<PathBuf>, options: DownloadOptions) -> Self {
        let template = template.into();
        Self {
            dataset: dataset_name(&template),
            template,
            options,
            attempt: 0,
            mode: Mode::Parallel,
        }
    }

    pub fn from_template(path: &Path) -> Result<Self, TemplateError> {
        let options = DownloadOptions::from_template(path)?;
        Ok(Self::new(path, options))
    }

    /// Fresh job for the serial verification pass.
    pub fn serial(&self) -> Self {
        Self {
            template: self.template.clone(),
            dataset: self.dataset.clone(),
            options: self.options.for_serial(),
            attempt: 0,
            mode: Mode::Serial,
        }
    }

    /// Arguments for a download launch: options followed by `--print --download`.
    pub fn download_args(&self) -> Vec<String> {
        let mut args = self.options.args().to_vec();
        args.push(PRINT_FLAG.to_string());
        args.push(DOWNLOAD_FLAG.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_in_parallel_mode() {
        let job = DownloadJob::new(
            "/t/GalapagosSenDT128.template",
            DownloadOptions::parse("-r 128 --parallel=6"),
        );
        assert_eq!(job.dataset, "GalapagosSenDT128");
        assert_eq!(job.attempt, 0);
        assert_eq!(job.mode, Mode::Parallel);
        assert_eq!(
            job.download_args(),
            ["-r", "128", "--parallel=6", "--print", "--download"]
        );
    }

    #[test]
    fn serial_job_resets_attempts_and_parallelism() {
        let mut job = DownloadJob::new("x.template", DownloadOptions::parse("--parallel=6"));
        job.attempt = 4;
        let serial = job.serial();
        assert_eq!(serial.attempt, 0);
        assert_eq!(serial.mode, Mode::Serial);
        assert_eq!(serial.download_args(), ["--parallel=1", "--print", "--download"]);
    }
}

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::guard::ChildGuard;
use super::job::DownloadJob;
use super::outcome::{Outcome, RunReport};
use crate::config::SsaraConfig;
use crate::control::SupervisorControl;
use crate::listing::{ExpectedFileSet, ListingSource, SsaraListing};
use crate::process::{Launcher, SystemLauncher};
use crate::retry::{classify, Mode, RetryDecision, RetryPolicy, Termination, TerminationKind};
use crate::sampler::{SizeSampler, WalkDirSampler};
use crate::verify;

/// Timing and retry settings for one supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Directory the downloader writes into; sampled for stalls and checked on verification.
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
    pub policy: RetryPolicy,
}

impl SupervisorSettings {
    pub fn from_config(cfg: &SsaraConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            poll_interval: Duration::from_secs(cfg.poll_interval_secs),
            policy: RetryPolicy::from(&cfg.retry_or_default()),
        }
    }
}

/// How a pass of launches ended.
enum PassEnd {
    /// No launches left in this mode when the pass started.
    CeilingReached,
    /// The last launch exited with a non-fatal code.
    Finished { code: i32 },
    /// Ceiling hit while launches kept failing; carries the last failure.
    Exhausted(TerminationKind),
    Aborted,
}

pub struct Supervisor {
    settings: SupervisorSettings,
    launcher: Box<dyn Launcher>,
    sampler: Arc<dyn SizeSampler>,
    listing: Arc<dyn ListingSource>,
    control: Arc<SupervisorControl>,
}

impl Supervisor {
    pub fn new(
        settings: SupervisorSettings,
        launcher: Box<dyn Launcher>,
        sampler: Box<dyn SizeSampler>,
        listing: Box<dyn ListingSource>,
    ) -> Self {
        Self {
            settings,
            launcher,
            sampler: Arc::from(sampler),
            listing: Arc::from(listing),
            control: Arc::new(SupervisorControl::new()),
        }
    }

    /// Supervisor wired to the real downloader, a directory walk and `--print` listing.
    pub fn system(cfg: &SsaraConfig, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self::new(
            SupervisorSettings::from_config(cfg, work_dir.clone()),
            Box::new(SystemLauncher::new(cfg.downloader.clone(), work_dir.clone())),
            Box::new(WalkDirSampler),
            Box::new(SsaraListing::new(cfg.downloader.clone(), work_dir)),
        )
    }

    pub fn with_control(mut self, control: Arc<SupervisorControl>) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> Arc<SupervisorControl> {
        Arc::clone(&self.control)
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Download, retry within the primary ceiling, then verify and repair in serial mode.
    pub async fn run(&self, job: &mut DownloadJob) -> Result<RunReport> {
        let started = Instant::now();
        let mut backoff = Duration::ZERO;
        tracing::info!("{}: download options: {}", job.dataset, job.options);

        let primary = self.run_pass(job, &mut backoff).await?;
        let mut serial = job.serial();
        let outcome = match primary {
            PassEnd::CeilingReached => Outcome::CeilingReached,
            PassEnd::Aborted => Outcome::Aborted,
            PassEnd::Exhausted(TerminationKind::Fatal { code }) => Outcome::FatalExhausted { code },
            PassEnd::Exhausted(_) => Outcome::HungExhausted,
            PassEnd::Finished { code } => {
                if code != 0 {
                    tracing::warn!(
                        "{}: downloader exited with code {}; verifying anyway",
                        job.dataset,
                        code
                    );
                }
                self.verify_and_repair(job, &mut serial, &mut backoff).await?
            }
        };

        let report = RunReport {
            dataset: job.dataset.clone(),
            outcome,
            launches: job.attempt,
            serial_launches: serial.attempt,
            backoff_secs: backoff.as_secs_f64(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            "{}: finished after {} launch(es) + {} serial: {:?}, success={}",
            report.dataset,
            report.launches,
            report.serial_launches,
            report.outcome,
            report.outcome.is_success()
        );
        Ok(report)
    }

    /// Expected basenames for `job` according to the downloader's listing mode.
    pub async fn expected_files(&self, job: &DownloadJob) -> Result<ExpectedFileSet> {
        self.listing_or_abort(job)
            .await?
            .ok_or_else(|| anyhow!("aborted while listing expected files for {}", job.dataset))
    }

    /// Expected files for `job` that are absent from the working directory.
    pub async fn missing_files(&self, job: &DownloadJob) -> Result<Vec<String>> {
        self.missing_or_abort(job)
            .await?
            .ok_or_else(|| anyhow!("aborted while verifying {}", job.dataset))
    }

    /// Run the listing on the blocking pool, racing it against an abort.
    /// `None` means the abort won.
    async fn listing_or_abort(&self, job: &DownloadJob) -> Result<Option<ExpectedFileSet>> {
        let listing = Arc::clone(&self.listing);
        let options = job.options.clone();
        let task = tokio::task::spawn_blocking(move || listing.expected_files(&options));
        tokio::select! {
            joined = task => {
                let expected = joined
                    .context("join listing task")?
                    .with_context(|| format!("list expected files for {}", job.dataset))?;
                Ok(Some(expected))
            }
            _ = self.control.aborted() => {
                tracing::warn!("{}: abort requested during listing", job.dataset);
                Ok(None)
            }
        }
    }

    async fn missing_or_abort(&self, job: &DownloadJob) -> Result<Option<Vec<String>>> {
        let Some(expected) = self.listing_or_abort(job).await? else {
            return Ok(None);
        };
        if expected.is_empty() {
            tracing::warn!("{}: listing reported no scenes", job.dataset);
        } else {
            tracing::debug!("{}: listing reported {} scene(s)", job.dataset, expected.len());
        }
        Ok(Some(verify::missing_files(&self.settings.work_dir, &expected)))
    }

    async fn sample_kb(&self) -> Result<u64> {
        let sampler = Arc::clone(&self.sampler);
        let work_dir = self.settings.work_dir.clone();
        tokio::task::spawn_blocking(move || sampler.sample_kb(&work_dir))
            .await
            .context("join size sampler task")?
            .with_context(|| format!("sample size of {}", self.settings.work_dir.display()))
    }

    async fn verify_and_repair(
        &self,
        job: &DownloadJob,
        serial: &mut DownloadJob,
        backoff: &mut Duration,
    ) -> Result<Outcome> {
        let policy = &self.settings.policy;
        loop {
            let Some(missing) = self.missing_or_abort(job).await? else {
                return Ok(Outcome::Aborted);
            };
            if missing.is_empty() {
                tracing::info!("{}: Everything is there!", job.dataset);
                return Ok(Outcome::Success);
            }
            tracing::warn!(
                "{}: {} expected file(s) missing: {}",
                job.dataset,
                missing.len(),
                missing.join(", ")
            );
            if !policy.can_launch(Mode::Serial, serial.attempt) {
                tracing::error!(
                    "{}: verification relaunches exhausted; download is incomplete",
                    job.dataset
                );
                return Ok(Outcome::VerificationIncomplete { missing });
            }
            if let PassEnd::Aborted = self.run_pass(serial, backoff).await? {
                return Ok(Outcome::Aborted);
            }
        }
    }

    /// Launch until a launch finishes, the mode's ceiling is hit, or an abort arrives.
    async fn run_pass(&self, job: &mut DownloadJob, backoff: &mut Duration) -> Result<PassEnd> {
        let policy = &self.settings.policy;
        let ceiling = policy.ceiling(job.mode);
        if !policy.can_launch(job.mode, job.attempt) {
            tracing::warn!(
                "{}: {} pass already used {} of {} launches; not starting",
                job.dataset,
                job.mode,
                job.attempt,
                ceiling
            );
            return Ok(PassEnd::CeilingReached);
        }

        loop {
            if self.control.is_aborted() {
                return Ok(PassEnd::Aborted);
            }
            job.attempt += 1;
            tracing::info!(
                "{}: {} launch {}/{}",
                job.dataset,
                job.mode,
                job.attempt,
                ceiling
            );
            let Some(termination) = self.supervise_launch(job).await? else {
                return Ok(PassEnd::Aborted);
            };
            let kind = classify(termination, &policy.fatal_exit_codes);
            match policy.decide(job.mode, job.attempt, kind) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        "{}: launch {} ended {:?}; relaunching in {}s",
                        job.dataset,
                        job.attempt,
                        kind,
                        delay.as_secs_f64()
                    );
                    *backoff += delay;
                    if !self.control.sleep(delay).await {
                        return Ok(PassEnd::Aborted);
                    }
                }
                RetryDecision::NoRetry => match kind {
                    TerminationKind::Finished { code } => return Ok(PassEnd::Finished { code }),
                    failed => {
                        tracing::error!(
                            "{}: {} pass gave up after {} launch(es), last {:?}",
                            job.dataset,
                            job.mode,
                            job.attempt,
                            failed
                        );
                        return Ok(PassEnd::Exhausted(failed));
                    }
                },
            }
        }
    }

    /// One launch: sample the work dir every poll interval until the child
    /// exits or two consecutive samples match. Exit status is checked before
    /// each sample, so a child that finished is never taken for a stall.
    /// `None` means aborted.
    async fn supervise_launch(&self, job: &DownloadJob) -> Result<Option<Termination>> {
        let child = self
            .launcher
            .launch(&job.download_args())
            .with_context(|| format!("launch downloader for {}", job.dataset))?;
        let mut child = ChildGuard::new(child);
        tracing::info!("{}: downloader started (pid {})", job.dataset, child.id());

        let started = Instant::now();
        let mut previous: Option<u64> = None;
        loop {
            if let Some(code) = child.try_wait().context("poll downloader")? {
                tracing::info!("{}: downloader exited with code {}", job.dataset, code);
                return Ok(Some(Termination::Exited(code)));
            }

            let size_kb = self.sample_kb().await?;
            tracing::info!(
                "{}: {:.1} min elapsed, {} KB downloaded",
                job.dataset,
                started.elapsed().as_secs_f64() / 60.0,
                size_kb
            );

            if previous == Some(size_kb) {
                // The child may have exited while the sample was taken.
                if let Some(code) = child.try_wait().context("poll downloader")? {
                    tracing::info!("{}: downloader exited with code {}", job.dataset, code);
                    return Ok(Some(Termination::Exited(code)));
                }
                tracing::warn!(
                    "{}: size unchanged at {} KB over {}s; download hung, terminating pid {}",
                    job.dataset,
                    size_kb,
                    self.settings.poll_interval.as_secs(),
                    child.id()
                );
                let code = child.terminate().await.context("terminate hung downloader")?;
                tracing::debug!("{}: hung downloader reaped ({:?})", job.dataset, code);
                return Ok(Some(Termination::Hung));
            }
            previous = Some(size_kb);

            if !self.control.sleep(self.settings.poll_interval).await {
                tracing::warn!("{}: abort requested; terminating downloader", job.dataset);
                child.terminate().await.context("terminate downloader")?;
                return Ok(None);
            }
        }
    }
}

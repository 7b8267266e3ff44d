//! `ssara-dl download` – supervise the downloader for one template.

use anyhow::{Context, Result};
use ssara_dl_core::config::SsaraConfig;
use ssara_dl_core::supervisor::{DownloadJob, Supervisor};
use std::path::Path;

pub async fn run_download(
    cfg: &SsaraConfig,
    work_dir: &Path,
    template: &Path,
    json: bool,
) -> Result<i32> {
    let mut job = DownloadJob::from_template(template)?;
    std::fs::create_dir_all(work_dir)
        .with_context(|| format!("create work dir {}", work_dir.display()))?;
    tracing::info!(
        "{}: downloading into {} with {}",
        job.dataset,
        work_dir.display(),
        cfg.downloader
    );

    let supervisor = Supervisor::system(cfg, work_dir);
    let control = supervisor.control();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping download");
            control.request_abort();
        }
    });

    let report = supervisor.run(&mut job).await;
    interrupt.abort();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(report.outcome.exit_code())
}

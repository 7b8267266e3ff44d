//! `ssara-dl list` – print the expected file set without downloading.

use anyhow::Result;
use ssara_dl_core::config::SsaraConfig;
use ssara_dl_core::supervisor::{DownloadJob, Supervisor};
use std::path::Path;

pub async fn run_list(cfg: &SsaraConfig, work_dir: &Path, template: &Path) -> Result<i32> {
    let job = DownloadJob::from_template(template)?;
    let supervisor = Supervisor::system(cfg, work_dir);
    let expected = supervisor.expected_files(&job).await?;
    for name in expected.iter() {
        println!("{name}");
    }
    tracing::info!("{}: {} expected file(s)", job.dataset, expected.len());
    Ok(0)
}

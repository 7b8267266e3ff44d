//! `ssara-dl verify` – compare the working directory with the expected listing.

use anyhow::Result;
use ssara_dl_core::config::SsaraConfig;
use ssara_dl_core::supervisor::{DownloadJob, Outcome, Supervisor};
use std::path::Path;

/// Prints missing files; exit code 0 when complete, else the incomplete-verification code.
pub async fn run_verify(cfg: &SsaraConfig, work_dir: &Path, template: &Path) -> Result<i32> {
    let job = DownloadJob::from_template(template)?;
    let supervisor = Supervisor::system(cfg, work_dir);
    let missing = supervisor.missing_files(&job).await?;
    if missing.is_empty() {
        println!("Everything is there!");
        return Ok(0);
    }
    println!("{} file(s) missing:", missing.len());
    for name in &missing {
        println!("  {name}");
    }
    Ok(Outcome::VerificationIncomplete { missing }.exit_code())
}

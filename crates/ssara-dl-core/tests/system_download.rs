//! End-to-end run against a shell script standing in for the SSARA tool:
//! real child process, real directory walk, real `--print` listing.

#![cfg(unix)]

use std::fs;
use std::time::Duration;

use ssara_dl_core::listing::SsaraListing;
use ssara_dl_core::process::SystemLauncher;
use ssara_dl_core::retry::RetryPolicy;
use ssara_dl_core::sampler::WalkDirSampler;
use ssara_dl_core::supervisor::{DownloadJob, Outcome, Supervisor, SupervisorSettings};
use ssara_dl_core::template::DownloadOptions;

const FAKE_SSARA: &str = r#"
for last; do :; done
if [ "$last" = "--download" ]; then
  head -c 2048 /dev/zero > S1A_IW_SLC_ONE.zip
  head -c 2048 /dev/zero > S1A_IW_SLC_TWO.zip
  exit 0
fi
echo "Running SSARA API Query"
echo "Collection,Platform,Url"
echo "Sentinel-1,SENTINEL-1A,https://datapool.example/SLC/SA/S1A_IW_SLC_ONE.zip"
echo "Sentinel-1,SENTINEL-1A,https://datapool.example/SLC/SA/S1A_IW_SLC_TWO.zip"
"#;

/// Downloads nothing: the scenes are already in the work dir.
const NOOP_SSARA: &str = r#"
for last; do :; done
if [ "$last" = "--download" ]; then
  exit 0
fi
echo "Collection,Platform,Url"
echo "Sentinel-1,SENTINEL-1A,https://datapool.example/SLC/SA/S1A_IW_SLC_ONE.zip"
"#;

struct Setup {
    supervisor: Supervisor,
    job: DownloadJob,
    work: tempfile::TempDir,
    _tools: tempfile::TempDir,
}

fn setup(script_body: &str) -> Setup {
    let tools = tempfile::tempdir().unwrap();
    let script = tools.path().join("fake_ssara.sh");
    fs::write(&script, script_body).unwrap();

    let work = tempfile::tempdir().unwrap();
    let settings = SupervisorSettings {
        work_dir: work.path().to_path_buf(),
        poll_interval: Duration::from_millis(500),
        policy: RetryPolicy {
            base_delay: Duration::ZERO,
            ..RetryPolicy::default()
        },
    };
    let supervisor = Supervisor::new(
        settings,
        Box::new(SystemLauncher::new("sh", work.path())),
        Box::new(WalkDirSampler),
        Box::new(SsaraListing::new("sh", work.path())),
    );

    let template = tools.path().join("GalapagosSenDT128.template");
    fs::write(
        &template,
        format!("ssaraopt = {} -r 128 --parallel=4\n", script.display()),
    )
    .unwrap();
    let job = DownloadJob::from_template(&template).unwrap();
    Setup {
        supervisor,
        job,
        work,
        _tools: tools,
    }
}

#[tokio::test]
async fn script_download_completes_and_verifies() {
    let mut s = setup(FAKE_SSARA);
    assert_eq!(s.job.dataset, "GalapagosSenDT128");

    let report = s.supervisor.run(&mut s.job).await.unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.launches, 1);
    assert_eq!(report.serial_launches, 0);
    assert!(s.work.path().join("S1A_IW_SLC_ONE.zip").exists());
    assert!(s.work.path().join("S1A_IW_SLC_TWO.zip").exists());
    assert!(s.supervisor.missing_files(&s.job).await.unwrap().is_empty());
}

#[tokio::test]
async fn quick_exit_with_files_present_is_one_launch() {
    let mut s = setup(NOOP_SSARA);
    fs::write(s.work.path().join("S1A_IW_SLC_ONE.zip"), vec![0u8; 2048]).unwrap();

    let report = s.supervisor.run(&mut s.job).await.unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.launches, 1);
    assert_eq!(report.serial_launches, 0);
    assert_eq!(report.backoff_secs, 0.0);
}

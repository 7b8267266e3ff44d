//! Scripted stand-ins for the downloader, size sampler and listing.
//!
//! Each launch pops a `ChildScript`; the shared `LaunchLog` records what the
//! supervisor did so tests can assert on launches and terminations.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use ssara_dl_core::listing::{ExpectedFileSet, ListingError, ListingSource};
use ssara_dl_core::process::{ChildProcess, Launcher};
use ssara_dl_core::sampler::SizeSampler;
use ssara_dl_core::template::DownloadOptions;

/// Behaviour of one scripted launch.
#[derive(Debug, Clone)]
pub struct ChildScript {
    /// Number of `try_wait` calls answered "still running" before exiting; `None` never exits.
    pub polls_before_exit: Option<usize>,
    pub exit_code: i32,
    /// Files written into the work dir when the child exits.
    pub creates: Vec<String>,
}

impl ChildScript {
    pub fn exits(code: i32) -> Self {
        Self {
            polls_before_exit: Some(0),
            exit_code: code,
            creates: Vec::new(),
        }
    }

    pub fn exits_creating(code: i32, files: &[&str]) -> Self {
        Self {
            creates: files.iter().map(|f| f.to_string()).collect(),
            ..Self::exits(code)
        }
    }

    pub fn never_exits() -> Self {
        Self {
            polls_before_exit: None,
            exit_code: 0,
            creates: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LaunchLog {
    pub launches: Vec<Vec<String>>,
    pub terminated: usize,
    pub exited: usize,
}

pub struct ScriptedLauncher {
    work_dir: PathBuf,
    scripts: Mutex<VecDeque<ChildScript>>,
    pub log: Arc<Mutex<LaunchLog>>,
}

impl ScriptedLauncher {
    pub fn new(work_dir: &Path, scripts: Vec<ChildScript>) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            scripts: Mutex::new(scripts.into()),
            log: Arc::new(Mutex::new(LaunchLog::default())),
        }
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, args: &[String]) -> io::Result<Box<dyn ChildProcess>> {
        let mut log = self.log.lock().unwrap();
        log.launches.push(args.to_vec());
        let pid = log.launches.len() as u32;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChildScript::exits(0));
        Ok(Box::new(ScriptedChild {
            pid,
            script,
            polls: 0,
            done: false,
            work_dir: self.work_dir.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedChild {
    pid: u32,
    script: ChildScript,
    polls: usize,
    done: bool,
    work_dir: PathBuf,
    log: Arc<Mutex<LaunchLog>>,
}

impl ChildProcess for ScriptedChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        if self.done {
            return Ok(Some(self.script.exit_code));
        }
        match self.script.polls_before_exit {
            Some(n) if self.polls >= n => {
                for name in &self.script.creates {
                    std::fs::write(self.work_dir.join(name), b"scene")?;
                }
                self.done = true;
                self.log.lock().unwrap().exited += 1;
                Ok(Some(self.script.exit_code))
            }
            _ => {
                self.polls += 1;
                Ok(None)
            }
        }
    }

    fn terminate(&mut self) -> io::Result<i32> {
        if self.done {
            return Ok(self.script.exit_code);
        }
        self.done = true;
        self.log.lock().unwrap().terminated += 1;
        Ok(137)
    }
}

/// Returns queued samples in order, then keeps growing so later polls never look hung.
pub struct ScriptedSampler {
    samples: Mutex<VecDeque<u64>>,
    last: Mutex<u64>,
}

impl ScriptedSampler {
    pub fn new(samples: &[u64]) -> Self {
        Self {
            samples: Mutex::new(samples.iter().copied().collect()),
            last: Mutex::new(samples.iter().copied().max().unwrap_or(0)),
        }
    }

    pub fn growing() -> Self {
        Self::new(&[])
    }
}

impl SizeSampler for ScriptedSampler {
    fn sample_kb(&self, _dir: &Path) -> io::Result<u64> {
        if let Some(next) = self.samples.lock().unwrap().pop_front() {
            return Ok(next);
        }
        let mut last = self.last.lock().unwrap();
        *last += 1024;
        Ok(*last)
    }
}

/// Fixed expected listing; counts how often it was consulted.
pub struct StaticListing {
    names: Vec<String>,
    pub calls: Arc<Mutex<usize>>,
}

impl StaticListing {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

impl ListingSource for StaticListing {
    fn expected_files(&self, _options: &DownloadOptions) -> Result<ExpectedFileSet, ListingError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.names.iter().cloned().collect())
    }
}

/// Listing that blocks its thread until released, like a `--print` query
/// stuck on a slow server. Signals `started` once it is running.
pub struct BlockingListing {
    started: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl BlockingListing {
    /// Returns the listing, a receiver fired when the listing starts, and a
    /// sender that unblocks it.
    pub fn new() -> (Self, tokio::sync::oneshot::Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let listing = Self {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
        };
        (listing, started_rx, release_tx)
    }
}

impl ListingSource for BlockingListing {
    fn expected_files(&self, _options: &DownloadOptions) -> Result<ExpectedFileSet, ListingError> {
        if let Some(started) = self.started.lock().unwrap().take() {
            let _ = started.send(());
        }
        let _ = self.release.lock().unwrap().recv();
        Ok(ExpectedFileSet::default())
    }
}

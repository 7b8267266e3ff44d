//! RAII guard that kills and reaps the downloader when dropped.

use anyhow::{Context, Result};

use crate::process::ChildProcess;

/// Terminates the child on drop unless it was observed to exit on its own.
pub(super) struct ChildGuard {
    child: Option<Box<dyn ChildProcess>>,
}

impl ChildGuard {
    pub(super) fn new(child: Box<dyn ChildProcess>) -> Self {
        Self { child: Some(child) }
    }

    pub(super) fn id(&self) -> u32 {
        self.child.as_ref().map(|c| c.id()).unwrap_or(0)
    }

    /// Poll the child; once it has exited the guard is disarmed.
    pub(super) fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        let status = child.try_wait()?;
        if status.is_some() {
            self.child = None;
        }
        Ok(status)
    }

    /// Kill and reap now. The reap blocks, so it runs on the blocking pool.
    pub(super) async fn terminate(&mut self) -> Result<Option<i32>> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let code = tokio::task::spawn_blocking(move || child.terminate())
            .await
            .context("join terminate task")??;
        Ok(Some(code))
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.terminate() {
                tracing::warn!("failed to terminate downloader pid {}: {}", child.id(), e);
            }
        }
    }
}

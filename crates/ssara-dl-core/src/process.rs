//! Launching and terminating the external downloader.
//!
//! The child runs in its own process group so a hang kill also takes down
//! any transfer workers it forked. Every terminated child is reaped.

use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

/// A running downloader process observed by polling.
pub trait ChildProcess: Send {
    fn id(&self) -> u32;

    /// Exit code if the child has exited (reaping it), `None` while running.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Kill the child (and its process group) and reap it; returns its exit code.
    fn terminate(&mut self) -> io::Result<i32>;
}

/// Starts downloader processes with the given arguments.
pub trait Launcher: Send + Sync {
    fn launch(&self, args: &[String]) -> io::Result<Box<dyn ChildProcess>>;
}

/// Launches `program args...` in `work_dir`, inheriting stdio.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: String,
    work_dir: PathBuf,
}

impl SystemLauncher {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
        }
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, args: &[String]) -> io::Result<Box<dyn ChildProcess>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.work_dir);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = cmd.spawn()?;
        Ok(Box::new(SystemChild { child }))
    }
}

struct SystemChild {
    child: Child,
}

impl ChildProcess for SystemChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(exit_code))
    }

    fn terminate(&mut self) -> io::Result<i32> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(exit_code(status));
        }
        #[cfg(unix)]
        kill_process_group(self.child.id());
        match self.child.kill() {
            Ok(()) => {}
            // Exited between try_wait and kill.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        Ok(exit_code(self.child.wait()?))
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) with a negative pid signals the group we created at spawn.
    let r = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if r != 0 {
        tracing::debug!(
            "kill process group {}: {}",
            pgid,
            io::Error::last_os_error()
        );
    }
}

/// Exit code of a finished process; death by signal N is reported as 128+N,
/// matching what a shell would show.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    -1
}

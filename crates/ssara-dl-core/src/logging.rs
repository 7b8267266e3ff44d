//! Logging init: `LEVEL - message` lines teed to a log file and the console.
//!
//! The log file lives under `$OPERATIONS/LOGS/` when that variable is set
//! (the processing-system convention), otherwise under the XDG state dir.
//! The console copy goes to stdout, or to stderr when stdout carries
//! machine-readable output. Falls back to the console only when the file
//! cannot be opened.

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the operations base directory.
pub const OPERATIONS_ENV: &str = "OPERATIONS";

const LOG_FILE_NAME: &str = "ssara_rsmas.log";
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_BACKUPS: u32 = 3;

/// Size-based rotation applied once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub max_bytes: u64,
    pub backups: u32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            backups: DEFAULT_BACKUPS,
        }
    }
}

impl Rotation {
    pub fn from_config(max_bytes: Option<u64>, backups: Option<u32>) -> Self {
        let d = Self::default();
        Self {
            max_bytes: max_bytes.unwrap_or(d.max_bytes),
            backups: backups.unwrap_or(d.backups),
        }
    }
}

/// Resolve the log file path: `$OPERATIONS/LOGS/ssara_rsmas.log`, else
/// `~/.local/state/ssara-dl/ssara_rsmas.log`.
pub fn log_file_path() -> Result<PathBuf> {
    if let Some(base) = std::env::var_os(OPERATIONS_ENV).filter(|v| !v.is_empty()) {
        return Ok(operations_log_path(Path::new(&base)));
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ssara-dl")?;
    Ok(xdg_dirs.get_state_home().join(LOG_FILE_NAME))
}

fn operations_log_path(base: &Path) -> PathBuf {
    base.join("LOGS").join(LOG_FILE_NAME)
}

/// Shift `path` to `path.1`, `path.1` to `path.2`, ... when it exceeds `max_bytes`.
/// The oldest backup beyond `backups` is overwritten.
pub fn rotate_if_needed(path: &Path, rotation: Rotation) -> io::Result<bool> {
    let len = match fs::metadata(path) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len <= rotation.max_bytes {
        return Ok(false);
    }
    if rotation.backups == 0 {
        fs::remove_file(path)?;
        return Ok(true);
    }
    for i in (1..rotation.backups).rev() {
        let from = backup_path(path, i);
        if from.exists() {
            fs::rename(&from, backup_path(path, i + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))?;
    Ok(true)
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Event format producing `LEVEL - message field=value`.
pub struct LevelDashFormat;

impl<S, N> FormatEvent<S, N> for LevelDashFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(writer, "{} - ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Console stream receiving the copy of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    #[default]
    Stdout,
    Stderr,
}

impl Console {
    fn write_all(self, buf: &[u8]) -> io::Result<()> {
        match self {
            Console::Stdout => io::stdout().lock().write_all(buf),
            Console::Stderr => io::stderr().lock().write_all(buf),
        }
    }

    fn flush(self) -> io::Result<()> {
        match self {
            Console::Stdout => io::stdout().lock().flush(),
            Console::Stderr => io::stderr().lock().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: None,
            console: *self,
        }
    }
}

/// Writer duplicating every line to the log file (when open) and the console.
pub struct TeeWriter {
    file: Option<fs::File>,
    console: Console,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(f) = self.file.as_mut() {
            f.write_all(buf)?;
        }
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(f) = self.file.as_mut() {
            f.flush()?;
        }
        self.console.flush()
    }
}

struct TeeMakeWriter {
    file: fs::File,
    console: Console,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        // A failed clone degrades to the console only rather than dropping the line.
        TeeWriter {
            file: self.file.try_clone().ok(),
            console: self.console,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging to `path` (append mode, rotated first) duplicated to `console`.
/// On failure returns Err so the caller can fall back to [`init_logging_console`].
pub fn init_logging(path: &Path, rotation: Rotation, console: Console) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rotated = rotate_if_needed(path, rotation)?;

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let writer: BoxMakeWriter = BoxMakeWriter::new(TeeMakeWriter { file, console });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .event_format(LevelDashFormat)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;

    if rotated {
        tracing::debug!("rotated previous log file");
    }
    tracing::debug!("logging to {}", path.display());
    Ok(())
}

/// Initialize logging to the console only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_console(console: Console) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(console)
        .with_ansi(false)
        .event_format(LevelDashFormat)
        .try_init();
}

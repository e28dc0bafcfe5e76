//! Rolling File Logger
//!
//! Installs a `tracing` subscriber that writes to `<dir>/<app_name>.log`,
//! rotating the file once it grows past a size cap, and keeps the most recent
//! lines in memory so a UI can show them without touching the disk.
//!
//! Records emitted through the `log` facade are bridged in as well; the
//! `info`/`error` helpers go through it.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Rotate once the active file would exceed this many bytes
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
/// Rotated files kept next to the active one
pub const MAX_ARCHIVES: usize = 3;
/// Lines retained by `recent_lines`
pub const RECENT_LINES: usize = 500;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("log file error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to install subscriber: {0}")]
    Init(String),
    #[error("logger not initialized")]
    NotInitialized,
}

static RECENT: OnceLock<Arc<RingBuffer>> = OnceLock::new();

/// Fixed-capacity buffer of log lines, oldest evicted first
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }
}

/// Size-capped log file with numbered archives
///
/// `<app>.log` is always the active file; `<app>.1.log` is the newest archive.
pub struct RollingFile {
    dir: PathBuf,
    app_name: String,
    file: File,
    written: u64,
    max_bytes: u64,
    max_archives: usize,
    recent: Option<Arc<RingBuffer>>,
}

impl RollingFile {
    pub fn open(dir: &Path, app_name: &str, max_bytes: u64, max_archives: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            file,
            written,
            max_bytes,
            max_archives,
            recent: None,
        })
    }

    /// Mirror every written line into `recent`
    pub fn with_buffer(mut self, recent: Arc<RingBuffer>) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    fn archive_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.{}.log", self.app_name, n))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_archives > 0 {
            let oldest = self.archive_path(self.max_archives);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.max_archives).rev() {
                let from = self.archive_path(n);
                if from.exists() {
                    fs::rename(&from, self.archive_path(n + 1))?;
                }
            }
            fs::rename(self.path(), self.archive_path(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path())?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        if let Some(recent) = &self.recent {
            for line in String::from_utf8_lossy(buf).lines().filter(|l| !l.trim().is_empty()) {
                recent.push(line);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber. Returns the active log file path.
///
/// The filter comes from `RUST_LOG`, falling back to `info`.
pub fn init_logger(dir: impl AsRef<Path>, app_name: &str) -> Result<PathBuf, LoggerError> {
    let recent = Arc::new(RingBuffer::new(RECENT_LINES));
    let file = RollingFile::open(dir.as_ref(), app_name, MAX_FILE_BYTES, MAX_ARCHIVES)?
        .with_buffer(recent.clone());
    let path = file.path();

    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(LocalTime)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::Init(e.to_string()))?;

    // A second init fails above, so the buffer is only ever set once
    let _ = RECENT.set(recent);
    Ok(path)
}

/// Log through the `log` facade, which the installed subscriber bridges
pub fn info(msg: &str) -> Result<(), LoggerError> {
    RECENT.get().ok_or(LoggerError::NotInitialized)?;
    log::info!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), LoggerError> {
    RECENT.get().ok_or(LoggerError::NotInitialized)?;
    log::error!("{}", msg);
    Ok(())
}

/// Most recent log lines, oldest first; empty before `init_logger`
pub fn recent_lines() -> Vec<String> {
    RECENT.get().map(|r| r.snapshot()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installs the global subscriber; the only test in this crate that does
    #[test]
    fn test_facade_records_reach_file_and_buffer() {
        assert!(matches!(info("too early"), Err(LoggerError::NotInitialized)));

        let dir = tempfile::tempdir().unwrap();
        let path = init_logger(dir.path(), "App").unwrap();
        info("database ready").unwrap();
        error("sync failed").unwrap();

        let lines = recent_lines();
        assert!(lines.iter().any(|l| l.contains("INFO") && l.contains("database ready")));
        assert!(lines.iter().any(|l| l.contains("ERROR") && l.contains("sync failed")));
        assert!(fs::read_to_string(path).unwrap().contains("sync failed"));
        assert!(matches!(init_logger(dir.path(), "App"), Err(LoggerError::Init(_))));
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let ring = RingBuffer::new(2);
        ring.push("a");
        ring.push("b");
        ring.push("c");
        assert_eq!(ring.snapshot(), vec!["b", "c"]);
    }

    #[test]
    fn test_rotation_keeps_bounded_archives() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "App", 10, 2).unwrap();
        for line in ["first-----\n", "second----\n", "third-----\n", "fourth----\n"] {
            file.write_all(line.as_bytes()).unwrap();
        }
        file.flush().unwrap();

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("App.log"), "fourth----\n");
        assert_eq!(read("App.1.log"), "third-----\n");
        assert_eq!(read("App.2.log"), "second----\n");
        assert!(!dir.path().join("App.3.log").exists());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut file = RollingFile::open(dir.path(), "App", 1024, 1).unwrap();
            file.write_all(b"one\n").unwrap();
        }
        let mut file = RollingFile::open(dir.path(), "App", 1024, 1).unwrap();
        file.write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_writes_are_mirrored_into_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let ring = Arc::new(RingBuffer::new(8));
        let mut file = RollingFile::open(dir.path(), "App", 1024, 1)
            .unwrap()
            .with_buffer(ring.clone());
        file.write_all(b"alpha\nbeta\n\n").unwrap();
        assert_eq!(ring.snapshot(), vec!["alpha", "beta"]);
    }
}

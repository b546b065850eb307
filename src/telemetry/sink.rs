//! Append-only destinations for telemetry lines

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::roster::Identity;

/// Destination for per-starter log lines
pub trait LogSink {
    /// Append one line for `identity`. A newline is added by the sink.
    fn append(&mut self, identity: &Identity, line: &str) -> io::Result<()>;
}

/// Writes `<dir>/<Name>.txt`, one file per starter
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the log directory (and parents) if it does not exist
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for `identity`
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.txt", identity))
    }
}

impl LogSink for FileSink {
    fn append(&mut self, identity: &Identity, line: &str) -> io::Result<()> {
        let path = self.path_for(identity);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        debug!(path = %path.display(), "Appended telemetry line");
        Ok(())
    }
}

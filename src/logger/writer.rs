//! Log writer module
//!
//! Thread-safe line sinks writing to stdout, stderr, a file, or any writer.
//! Each line is written with a single `write_all` while the sink's lock is
//! held, so concurrent requests never interleave inside a line.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// A single append-only log stream
pub struct LogSink {
    target: Mutex<Box<dyn Write + Send>>,
}

impl LogSink {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    /// Append to `path`, creating it and any missing parent directories
    pub fn file(path: &str) -> io::Result<Self> {
        Ok(Self::from_writer(open_log_file(path)?))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            target: Mutex::new(Box::new(writer)),
        }
    }

    /// Write `message` followed by a newline
    pub fn write_line(&self, message: &str) {
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');

        if let Ok(mut target) = self.target.lock() {
            let _ = target.write_all(line.as_bytes());
            let _ = target.flush();
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

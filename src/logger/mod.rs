//! Logger module
//!
//! Holds the two log streams of the server:
//! - the access log, one line per handled request (stdout by default)
//! - the error log, for failed requests and server lifecycle (stderr by default)
//!
//! A `Logs` value is created once at startup and shared by reference; there
//! is no global logger.

mod format;
pub mod writer;

pub use format::{AccessLogEntry, ErrorLogEntry};
pub use writer::LogSink;

use crate::config::LoggingConfig;
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;

/// Access and error log streams
#[derive(Debug)]
pub struct Logs {
    access: LogSink,
    error: LogSink,
}

impl Logs {
    pub const fn new(access: LogSink, error: LogSink) -> Self {
        Self { access, error }
    }

    /// Open the configured log files, falling back to stdout/stderr
    pub fn from_config(config: &LoggingConfig) -> std::io::Result<Self> {
        let access = match config.access_log_file.as_deref() {
            Some(path) => LogSink::file(path)?,
            None => LogSink::stdout(),
        };
        let error = match config.error_log_file.as_deref() {
            Some(path) => LogSink::file(path)?,
            None => LogSink::stderr(),
        };
        Ok(Self::new(access, error))
    }

    pub fn access(&self, entry: &AccessLogEntry) {
        self.access.write_line(&entry.format());
    }

    pub fn error(&self, entry: &ErrorLogEntry) {
        self.error.write_line(&entry.format());
    }

    /// Timestamped message on the error stream
    pub fn info(&self, message: &str) {
        self.error.write_line(&format::timestamped(Utc::now(), message));
    }

    pub fn log_serving_from(&self, root: &Path) {
        self.info(&format!("Serving files from {}", root.display()));
    }

    pub fn log_listening(&self, addr: &SocketAddr) {
        self.info(&format!("Listening on {addr}"));
    }

    pub fn log_shutting_down(&self) {
        self.info("Shutting down");
    }

    pub fn log_listener_error(&self, err: &std::io::Error) {
        self.info(&format!("Listener error {err}"));
    }

    pub fn log_accept_error(&self, err: &std::io::Error) {
        self.info(&format!("http: Accept error: {err}"));
    }

    pub fn log_connection_error(&self, peer_addr: &SocketAddr, err: &impl std::fmt::Display) {
        self.info(&format!("http: error serving {peer_addr}: {err}"));
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLogs;

    #[test]
    fn test_info_goes_to_error_stream() {
        let mem = MemoryLogs::new();
        mem.logs.log_listening(&"127.0.0.1:9807".parse().unwrap());

        assert!(mem.access.lines().is_empty());
        let lines = mem.error.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" Listening on 127.0.0.1:9807"), "{}", lines[0]);
    }

    #[test]
    fn test_from_config_opens_files() {
        let dir = tempfile::tempdir().unwrap();
        let access = dir.path().join("access.log");
        let error = dir.path().join("error.log");
        let config = crate::config::LoggingConfig {
            access_log_file: Some(access.to_string_lossy().into_owned()),
            error_log_file: Some(error.to_string_lossy().into_owned()),
        };

        let logs = super::Logs::from_config(&config).unwrap();
        logs.log_shutting_down();

        assert!(access.exists());
        assert!(std::fs::read_to_string(&error).unwrap().ends_with("Shutting down\n"));
    }
}

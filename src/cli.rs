//! Command line interface

use crate::config::DEFAULT_CONFIG_FILE;
use crate::handler::resolver;
use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};

/// Serve static files from a directory tree on disk
#[derive(Debug, Parser)]
#[command(name = "static-server", version)]
pub struct Cli {
    /// Set the service's listener address/port
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Configuration file, extension optional
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Directory to serve
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,
}

impl Cli {
    /// Parse the process arguments. Usage errors and `--help` print usage and
    /// exit with status 1.
    pub fn parse_or_exit() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                let _ = err.print();
                std::process::exit(1);
            }
        }
    }
}

/// Absolute form of the served directory.
///
/// An existing directory is canonicalized so symlinks inside it resolve to
/// paths under it. A missing one is only cleaned; the error shows up on the
/// first request.
pub fn resolve_root(directory: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(directory)?;
    Ok(std::fs::canonicalize(&absolute).unwrap_or_else(|_| resolver::clean(&absolute)))
}

// Configuration module entry point
// Layers defaults, an optional config file, STATIC_* environment variables,
// and command line overrides

mod types;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

// Re-export public types
pub use types::{Config, LoggingConfig, PerformanceConfig};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:9807";
pub const DEFAULT_CONFIG_FILE: &str = "static";

/// Values supplied on the command line; they win over every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub listen: Option<&'a str>,
}

impl Config {
    /// Load configuration from specified file path (extension optional)
    pub fn load_from(
        config_path: &str,
        root: &Path,
        overrides: &Overrides<'_>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("STATIC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.listen", DEFAULT_LISTEN)?
            .set_default("performance.read_timeout", 1)?
            .set_default("performance.write_timeout", 60)?
            .set_default("performance.idle_timeout", 60)?
            .set_default("security.strict_containment", false)?
            .set_override("server.root", root.to_string_lossy().into_owned())?;

        if let Some(listen) = overrides.listen {
            builder = builder.set_override("server.listen", listen)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the runtime cannot start with
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the listen address. A bare `:port` listens on all interfaces.
    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        let listen = self.server.listen.trim();
        let listen = if listen.starts_with(':') {
            format!("0.0.0.0{listen}")
        } else {
            listen.to_string()
        };

        listen
            .to_socket_addrs()
            .map_err(|e| format!("Invalid address {listen}: {e}"))?
            .next()
            .ok_or_else(|| format!("Invalid address {listen}: no addresses resolved"))
    }
}

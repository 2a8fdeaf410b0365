use std::process::ExitCode;
use std::sync::Arc;

mod cli;
mod config;
mod handler;
mod http;
mod logger;
mod server;

use cli::Cli;
use handler::{Containment, FileServer, PathResolver};
use logger::Logs;
use server::{ConnectionSettings, SignalHandler};

fn main() -> ExitCode {
    let cli = Cli::parse_or_exit();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let root = cli::resolve_root(&cli.directory)
        .map_err(|e| format!("Unable to resolve root path {}: {e}", cli.directory.display()))?;

    let overrides = config::Overrides {
        listen: cli.listen.as_deref(),
    };
    let cfg = config::Config::load_from(&cli.config, &root, &overrides)?;
    let logs = Arc::new(Logs::from_config(&cfg.logging)?);

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, logs))
}

async fn async_main(
    cfg: config::Config,
    logs: Arc<Logs>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let resolver = PathResolver::new(
        &cfg.server.root,
        Containment::from_strict(cfg.security.strict_containment),
    );

    let file_server = Arc::new(FileServer::new(resolver, Arc::clone(&logs)));
    logs.log_serving_from(file_server.root());

    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    // Already reported on the error log
    let Some(listener) = server::bind_listener(addr, &logs) else {
        return Ok(ExitCode::FAILURE);
    };
    logs.log_listening(&listener.local_addr()?);

    server::start_server_loop(
        listener,
        file_server,
        ConnectionSettings::from(&cfg.performance),
        signals,
    )
    .await;

    Ok(ExitCode::SUCCESS)
}

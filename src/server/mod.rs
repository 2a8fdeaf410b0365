// Server module entry point
// Listener setup, connection handling, signals, and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so use server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used items
pub use connection::ConnectionSettings;
pub use listener::bind_listener;
pub use signal::{start_signal_handler, SignalHandler};
pub use server_loop::start_server_loop;

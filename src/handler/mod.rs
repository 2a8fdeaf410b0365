//! Request handler module
//!
//! Path resolution, file serving, and the error mapping between them.

pub mod error;
pub mod resolver;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use resolver::{Containment, PathResolver};
pub use router::handle_request;
pub use static_files::FileServer;

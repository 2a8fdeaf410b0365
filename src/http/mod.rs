//! HTTP protocol layer module
//!
//! Request metadata, response builders, MIME detection, and the metered body
//! that feeds the access log.

pub mod body;
pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use body::{MeteredBody, ResponseMeter};
pub use request::RequestContext;
pub use response::{build_404_response, build_500_response, ResponseBody};

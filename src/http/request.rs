//! Request metadata captured for logging
//!
//! Only the URL path drives serving; everything else here exists so the
//! access and error logs can describe the request after the fact.

use hyper::header::{HeaderMap, REFERER, USER_AGENT};
use hyper::{Method, Request, Uri, Version};
use std::net::SocketAddr;

/// Per-request context
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub remote_addr: SocketAddr,
    pub remote_user: Option<String>,
    pub method: Method,
    /// Request target as received
    pub uri: String,
    pub version: Version,
    pub referer: String,
    pub user_agent: String,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>, remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            remote_user: remote_user(req.uri()),
            method: req.method().clone(),
            uri: req.uri().to_string(),
            version: req.version(),
            referer: header_string(req.headers(), REFERER),
            user_agent: header_string(req.headers(), USER_AGENT),
        }
    }

    /// Protocol as it appears in a request line
    pub fn proto(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }
}

fn header_string(headers: &HeaderMap, name: hyper::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// User name from the `user[:password]@` part of an absolute-form target
fn remote_user(uri: &Uri) -> Option<String> {
    let (userinfo, _) = uri.authority()?.as_str().rsplit_once('@')?;
    let name = userinfo.split(':').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

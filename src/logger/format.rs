//! Log line formats
//!
//! The access log follows the nginx combined layout with the request time
//! added after the status:
//!
//! `$remote_addr - $remote_user [$time] "$request" $status $request_time $body_bytes_sent "$http_referer" "$http_user_agent"`
//!
//! Error log lines carry a `YYYY/MM/DD HH:MM:SS` UTC prefix.

use crate::http::request::RequestContext;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use std::fmt::Display;
use std::time::Duration;

const ACCESS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f +0000 UTC";
const ERROR_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// One access log line
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub remote_user: Option<String>,
    pub time: DateTime<Utc>,
    pub method: String,
    pub uri: String,
    pub proto: &'static str,
    pub status: u16,
    pub request_time: Duration,
    pub body_bytes: u64,
    pub referer: String,
    pub user_agent: String,
}

impl AccessLogEntry {
    /// Build an entry stamped with the current time
    pub fn new(
        ctx: &RequestContext,
        status: StatusCode,
        request_time: Duration,
        body_bytes: u64,
    ) -> Self {
        Self {
            remote_addr: ctx.remote_addr.to_string(),
            remote_user: ctx.remote_user.clone(),
            time: Utc::now(),
            method: ctx.method.to_string(),
            uri: ctx.uri.clone(),
            proto: ctx.proto(),
            status: status.as_u16(),
            request_time,
            body_bytes,
            referer: ctx.referer.clone(),
            user_agent: ctx.user_agent.clone(),
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{} - {} [{}] \"{} {} {}\" {} {:?} {} \"{}\" \"{}\"",
            self.remote_addr,
            self.remote_user.as_deref().unwrap_or("-"),
            self.time.format(ACCESS_TIME_FORMAT),
            self.method,
            self.uri,
            self.proto,
            self.status,
            self.request_time,
            self.body_bytes,
            self.referer,
            self.user_agent,
        )
    }
}

/// One error log line describing a failed request
#[derive(Debug, Clone)]
pub struct ErrorLogEntry {
    pub time: DateTime<Utc>,
    pub remote_addr: String,
    pub method: String,
    pub uri: String,
    pub proto: &'static str,
    pub detail: String,
}

impl ErrorLogEntry {
    pub fn new(ctx: &RequestContext, detail: &impl Display) -> Self {
        Self {
            time: Utc::now(),
            remote_addr: ctx.remote_addr.to_string(),
            method: ctx.method.to_string(),
            uri: ctx.uri.clone(),
            proto: ctx.proto(),
            detail: detail.to_string(),
        }
    }

    pub fn format(&self) -> String {
        timestamped(
            self.time,
            &format!(
                "{} {} {} {} {}",
                self.remote_addr, self.method, self.uri, self.proto, self.detail
            ),
        )
    }
}

/// Prefix a message with the error log timestamp
pub fn timestamped(time: DateTime<Utc>, message: &str) -> String {
    format!("{} {message}", time.format(ERROR_TIME_FORMAT))
}

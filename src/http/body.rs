//! Metered response bodies
//!
//! `MeteredBody` wraps the body actually sent to the client. It counts data
//! bytes as the transport pulls them and writes the request's access log
//! line exactly once: when the body ends, fails, or is dropped before
//! completion (client gone, HEAD request, shutdown). An error line attached
//! to the body is written right after the access line.

use crate::http::request::RequestContext;
use crate::http::response::ResponseBody;
use crate::logger::{AccessLogEntry, ErrorLogEntry, Logs};
use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::StatusCode;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Bytes sent and time elapsed since handling began
#[derive(Debug, Clone, Copy)]
pub struct ResponseMeter {
    started: Instant,
    bytes: u64,
}

impl ResponseMeter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
        }
    }

    pub fn record(&mut self, len: usize) {
        self.bytes += len as u64;
    }

    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn duration(&self) -> Duration {
        self.started.elapsed()
    }
}

struct PendingAccess {
    logs: Arc<Logs>,
    ctx: RequestContext,
    status: StatusCode,
    error: Option<ErrorLogEntry>,
}

/// Response body that logs the request once it has been sent
pub struct MeteredBody {
    inner: ResponseBody,
    meter: ResponseMeter,
    pending: Option<PendingAccess>,
}

impl MeteredBody {
    pub fn new(
        inner: ResponseBody,
        meter: ResponseMeter,
        logs: Arc<Logs>,
        ctx: RequestContext,
        status: StatusCode,
    ) -> Self {
        Self {
            inner,
            meter,
            pending: Some(PendingAccess {
                logs,
                ctx,
                status,
                error: None,
            }),
        }
    }

    /// Attach an error log line to be written after the access line
    #[must_use]
    pub fn with_error(mut self, entry: ErrorLogEntry) -> Self {
        if let Some(pending) = self.pending.as_mut() {
            pending.error = Some(entry);
        }
        self
    }

    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.logs.access(&AccessLogEntry::new(
                &pending.ctx,
                pending.status,
                self.meter.duration(),
                self.meter.bytes(),
            ));
            if let Some(entry) = &pending.error {
                pending.logs.error(entry);
            }
        }
    }
}

impl Body for MeteredBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.meter.record(data.len());
                }
            }
            // A read error mid-stream truncates the body; the status line
            // has already gone out, so it is logged as sent.
            Poll::Ready(Some(Err(_)) | None) => this.finish(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for MeteredBody {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::full_body;
    use crate::logger::testing::MemoryLogs;
    use http_body_util::BodyExt;
    use hyper::Request;

    fn context() -> RequestContext {
        let req = Request::builder().uri("/a.txt").body(()).unwrap();
        RequestContext::from_request(&req, "127.0.0.1:5000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_counts_bytes_and_logs_once() {
        let mem = MemoryLogs::new();
        let body = MeteredBody::new(
            full_body("hello world"),
            ResponseMeter::start(),
            Arc::clone(&mem.logs),
            context(),
            StatusCode::OK,
        );

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes, "hello world");

        let lines = mem.access.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"GET /a.txt HTTP/1.1\" 200 "), "{}", lines[0]);
        assert!(lines[0].contains(" 11 \"\" \"\""), "{}", lines[0]);
    }

    #[test]
    fn test_dropped_body_logs_once() {
        let mem = MemoryLogs::new();
        let body = MeteredBody::new(
            full_body("never sent"),
            ResponseMeter::start(),
            Arc::clone(&mem.logs),
            context(),
            StatusCode::OK,
        );
        drop(body);

        let lines = mem.access.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" 200 "), "{}", lines[0]);
        assert!(lines[0].contains(" 0 \"\" \"\""), "{}", lines[0]);
        assert!(mem.error.lines().is_empty());
    }

    #[test]
    fn test_error_line_follows_access_line() {
        use crate::logger::testing::SharedBuffer;
        use crate::logger::LogSink;

        // Both streams share one buffer so their relative order is visible
        let shared = SharedBuffer::default();
        let logs = Arc::new(Logs::new(
            LogSink::from_writer(shared.clone()),
            LogSink::from_writer(shared.clone()),
        ));
        let ctx = context();
        let body = MeteredBody::new(
            full_body("404 page not found\n"),
            ResponseMeter::start(),
            logs,
            ctx.clone(),
            StatusCode::NOT_FOUND,
        )
        .with_error(ErrorLogEntry::new(&ctx, &"open /srv/a.txt: permission denied"));
        drop(body);

        let lines = shared.lines();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains("\"GET /a.txt HTTP/1.1\" 404 "), "{}", lines[0]);
        assert!(
            lines[1].ends_with("GET /a.txt HTTP/1.1 open /srv/a.txt: permission denied"),
            "{}",
            lines[1]
        );
    }

    #[test]
    fn test_meter_accumulates() {
        let mut meter = ResponseMeter::start();
        meter.record(10);
        meter.record(5);
        assert_eq!(meter.bytes(), 15);
        assert!(meter.duration() >= Duration::ZERO);
    }
}

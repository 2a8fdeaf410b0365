// Connection handling module
// Serves a single accepted TCP connection with hyper's HTTP/1 implementation
//
// Timeouts:
// - header read: hyper's own timer on receiving request headers
// - write: each response must be fully sent within `write_timeout` of the
//   request being handed to the server
// - idle: a keep-alive connection with no request in flight is closed after
//   `idle_timeout`

use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::Sleep;

use crate::config::PerformanceConfig;
use crate::handler::{self, FileServer};
use crate::http::MeteredBody;

/// Per-connection transport limits
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Time allowed to receive request headers
    pub header_read_timeout: Duration,
    /// Time allowed to produce and send one response
    pub write_timeout: Duration,
    /// Time a keep-alive connection may wait for its next request
    pub idle_timeout: Duration,
}

impl From<&PerformanceConfig> for ConnectionSettings {
    fn from(config: &PerformanceConfig) -> Self {
        Self {
            header_read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Requests in flight on one connection and when it was last busy
#[derive(Debug)]
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds after `opened`
    last_active: AtomicU64,
}

impl Activity {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_active: AtomicU64::new(0),
        })
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn touch(&self) {
        self.last_active.store(self.now_ms(), Ordering::SeqCst);
    }

    /// Mark a request as in flight until the returned guard is dropped
    fn begin(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        ActivityGuard(Arc::clone(self))
    }

    /// Resolves once no request has been in flight for `timeout`
    async fn idle(&self, timeout: Duration) {
        loop {
            if self.in_flight.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(timeout).await;
                continue;
            }

            let since = self.now_ms().saturating_sub(self.last_active.load(Ordering::SeqCst));
            let idle_for = Duration::from_millis(since);
            if idle_for >= timeout {
                return;
            }
            tokio::time::sleep(timeout - idle_for).await;
        }
    }
}

#[derive(Debug)]
struct ActivityGuard(Arc<Activity>);

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.0.touch();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Response body that fails once the request's write deadline passes.
///
/// The error makes hyper abort the connection; the inner body still logs the
/// request when it is dropped.
pub struct TimedBody {
    inner: MeteredBody,
    deadline: Pin<Box<Sleep>>,
    _activity: ActivityGuard,
}

impl Body for TimedBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.deadline.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "response write timeout",
            ))));
        }
        Pin::new(&mut this.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 keep-alive and the header read timeout
/// 3. Bounds every response by the write timeout
/// 4. Registers the connection for graceful shutdown
/// 5. Closes the connection once it has been idle for `idle_timeout`
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `server` - File server answering every request
/// * `settings` - Transport timeouts
/// * `graceful` - Shutdown coordinator the connection is registered with
pub fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    server: Arc<FileServer>,
    settings: ConnectionSettings,
    graceful: &GracefulShutdown,
) {
    let io = TokioIo::new(stream);
    let logs = Arc::clone(server.logs());
    let activity = Activity::new();

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(settings.header_read_timeout)
        .keep_alive(true);

    let service = {
        let activity = Arc::clone(&activity);
        service_fn(move |req| {
            let server = Arc::clone(&server);
            let guard = activity.begin();
            async move {
                let deadline = Box::pin(tokio::time::sleep(settings.write_timeout));
                let response = handler::handle_request(req, peer_addr, &server).await;
                Ok::<_, Infallible>(response.map(|inner| TimedBody {
                    inner,
                    deadline,
                    _activity: guard,
                }))
            }
        })
    };
    let conn = graceful.watch(builder.serve_connection(io, service));

    tokio::spawn(async move {
        tokio::select! {
            result = conn => {
                if let Err(err) = result {
                    logs.log_connection_error(&peer_addr, &err);
                }
            }
            () = activity.idle(settings.idle_timeout) => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::ResponseBody;
    use crate::http::{RequestContext, ResponseMeter};
    use crate::logger::testing::MemoryLogs;
    use http_body_util::{BodyExt, StreamBody};
    use hyper::{Request, StatusCode};

    #[test]
    fn test_settings_from_performance_config() {
        let config = PerformanceConfig {
            read_timeout: 1,
            write_timeout: 60,
            idle_timeout: 90,
        };
        let settings = ConnectionSettings::from(&config);
        assert_eq!(settings.header_read_timeout, Duration::from_secs(1));
        assert_eq!(settings.write_timeout, Duration::from_secs(60));
        assert_eq!(settings.idle_timeout, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_idle_waits_for_in_flight_requests() {
        let activity = Activity::new();
        let timeout = Duration::from_millis(50);

        let guard = activity.begin();
        let busy = tokio::time::timeout(Duration::from_millis(200), activity.idle(timeout)).await;
        assert!(busy.is_err(), "idle while a request was in flight");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(2), activity.idle(timeout))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stalled_body_fails_at_write_deadline() {
        let mem = MemoryLogs::new();
        let req = Request::builder().uri("/slow.bin").body(()).unwrap();
        let ctx = RequestContext::from_request(&req, "127.0.0.1:5000".parse().unwrap());
        let stalled: ResponseBody = StreamBody::new(futures_util::stream::pending::<
            Result<Frame<Bytes>, io::Error>,
        >())
        .boxed_unsync();

        let activity = Activity::new();
        let mut body = TimedBody {
            inner: MeteredBody::new(
                stalled,
                ResponseMeter::start(),
                Arc::clone(&mem.logs),
                ctx,
                StatusCode::OK,
            ),
            deadline: Box::pin(tokio::time::sleep(Duration::from_millis(20))),
            _activity: activity.begin(),
        };

        let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
            .await
            .unwrap();
        let err = frame.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        drop(body);
        assert_eq!(activity.in_flight.load(Ordering::SeqCst), 0);
        let access = mem.access.lines();
        assert_eq!(access.len(), 1);
        assert!(access[0].contains("\"GET /slow.bin HTTP/1.1\" 200 "), "{}", access[0]);
    }
}

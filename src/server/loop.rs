// Server loop module
// Accepts connections until shutdown is requested, then drains them

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::{handle_connection, ConnectionSettings};
use super::signal::SignalHandler;
use crate::handler::FileServer;

/// Accept and serve connections until `signals` requests shutdown.
///
/// After the first shutdown request the listener is closed and in-flight
/// connections are allowed to finish. A second request stops waiting for them.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    server: Arc<FileServer>,
    settings: ConnectionSettings,
    signals: Arc<SignalHandler>,
) {
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        handle_connection(stream, peer_addr, Arc::clone(&server), settings, &graceful);
                    }
                    Err(e) => server.logs().log_accept_error(&e),
                }
            }

            _ = signals.shutdown.notified() => break,
        }
    }

    server.logs().log_shutting_down();
    drop(listener);

    tokio::select! {
        _ = graceful.shutdown() => {}
        _ = signals.shutdown.notified() => {
            server.logs().info("Shutdown interrupted, abandoning open connections");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Containment, PathResolver};
    use crate::logger::testing::MemoryLogs;
    use crate::server::listener::create_listener;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn fetch(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_serves_over_tcp_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::write(root.join("hello.txt"), "hello over tcp").unwrap();

        let mem = MemoryLogs::new();
        let server = Arc::new(FileServer::new(
            PathResolver::new(root, Containment::Prefix),
            Arc::clone(&mem.logs),
        ));
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let signals = Arc::new(SignalHandler::new());
        let settings = ConnectionSettings {
            header_read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(10),
        };

        let task = tokio::spawn(start_server_loop(
            listener,
            server,
            settings,
            Arc::clone(&signals),
        ));

        let ok = fetch(
            addr,
            "GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nUser-Agent: raw\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"), "{ok}");
        let lower = ok.to_ascii_lowercase();
        assert!(lower.contains("content-length: 14\r\n"), "{ok}");
        assert!(lower.contains("content-type: text/plain; charset=utf-8\r\n"), "{ok}");
        assert!(lower.contains("last-modified: "), "{ok}");
        assert!(ok.ends_with("\r\n\r\nhello over tcp"), "{ok}");

        let missing = fetch(
            addr,
            "GET /../etc/passwd HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"), "{missing}");

        signals.request_shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        // Access lines are written once the body is finished, which may trail
        // the client seeing the last byte
        tokio::time::sleep(Duration::from_millis(50)).await;
        let access = mem.access.lines();
        assert_eq!(access.len(), 2, "{access:?}");
        assert!(access[0].starts_with("127.0.0.1:"), "{}", access[0]);
        assert!(access[0].contains("\"GET /hello.txt HTTP/1.1\" 200 "), "{}", access[0]);
        assert!(access[0].ends_with(" 14 \"\" \"raw\""), "{}", access[0]);
        assert!(access[1].contains("\" 404 "), "{}", access[1]);

        let errors = mem.error.lines();
        assert!(errors.iter().any(|l| l.ends_with("Shutting down")), "{errors:?}");
    }
}

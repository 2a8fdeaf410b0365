//! Request dispatch module
//!
//! Entry point for HTTP request processing. Every method and path goes to
//! the file server; only the URL path is inspected.

use crate::handler::static_files::FileServer;
use crate::http::{MeteredBody, RequestContext, ResponseMeter};
use hyper::{Request, Response};
use std::net::SocketAddr;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    remote_addr: SocketAddr,
    server: &FileServer,
) -> Response<MeteredBody> {
    let meter = ResponseMeter::start();
    let ctx = RequestContext::from_request(&req, remote_addr);
    let path = req.uri().path().to_owned();
    drop(req);

    server.serve_request(ctx, meter, &path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::resolver::{Containment, PathResolver};
    use crate::logger::testing::MemoryLogs;
    use http_body_util::BodyExt;
    use hyper::{Method, StatusCode};
    use std::sync::Arc;

    fn server(root: &std::path::Path, mem: &MemoryLogs) -> FileServer {
        FileServer::new(
            PathResolver::new(root, Containment::Prefix),
            Arc::clone(&mem.logs),
        )
    }

    #[tokio::test]
    async fn test_any_method_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::write(root.join("a.json"), "{}").unwrap();
        let mem = MemoryLogs::new();
        let server = server(&root, &mem);

        for method in [Method::GET, Method::POST, Method::DELETE] {
            let req = Request::builder()
                .method(method.clone())
                .uri("/a.json?ignored=1")
                .header("User-Agent", "test-agent")
                .body(())
                .unwrap();
            let response = handle_request(req, "10.1.2.3:999".parse().unwrap(), &server).await;
            assert_eq!(response.status(), StatusCode::OK, "{method}");
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, "{}");
        }

        let lines = mem.access.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("10.1.2.3:999 - - ["), "{}", lines[1]);
        assert!(
            lines[1].contains("\"POST /a.json?ignored=1 HTTP/1.1\" 200 "),
            "{}",
            lines[1]
        );
        assert!(lines[1].ends_with(" 2 \"\" \"test-agent\""), "{}", lines[1]);
    }

    #[tokio::test]
    async fn test_missing_root_surfaces_as_404() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("does-not-exist");
        let mem = MemoryLogs::new();
        let server = server(&root, &mem);

        let req = Request::builder().uri("/index.html").body(()).unwrap();
        let response = handle_request(req, "10.1.2.3:999".parse().unwrap(), &server).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        drop(response);

        assert_eq!(mem.access.lines().len(), 1);
        assert!(mem.error.lines().is_empty());
    }
}

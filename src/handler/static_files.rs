//! Static file serving module
//!
//! Serves regular files beneath the root, follows symlinks whose final
//! target is also beneath the root, and maps every failure to a response.
//! Nothing is cached: each request stats and opens the file afresh.

use crate::handler::error::{FsOp, ServeError};
use crate::handler::resolver::{decode_request_path, PathResolver};
use crate::http::{self, mime, response, MeteredBody, RequestContext, ResponseBody, ResponseMeter};
use crate::logger::{ErrorLogEntry, Logs};
use hyper::header::{
    HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED,
};
use hyper::{Response, StatusCode};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Serves files from one root directory
#[derive(Debug)]
pub struct FileServer {
    resolver: PathResolver,
    logs: Arc<Logs>,
}

impl FileServer {
    pub const fn new(resolver: PathResolver, logs: Arc<Logs>) -> Self {
        Self { resolver, logs }
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub const fn logs(&self) -> &Arc<Logs> {
        &self.logs
    }

    /// Serve the file addressed by the raw URL path of a request
    pub async fn serve_request(
        &self,
        ctx: RequestContext,
        meter: ResponseMeter,
        raw_path: &str,
    ) -> Response<MeteredBody> {
        let Some(request_path) = decode_request_path(raw_path) else {
            return self.serve_error(ctx, meter, &ServeError::NotFound);
        };
        let candidate = self.resolver.resolve(&request_path);
        self.serve_file(ctx, meter, candidate, HeaderMap::new()).await
    }

    /// Stream `target` to the client.
    ///
    /// `headers` may carry a `Content-Type` or `Content-Encoding` chosen by
    /// the caller; those are left alone. Symlinks are resolved to their final
    /// target and the containment check runs again on the result.
    pub async fn serve_file(
        &self,
        ctx: RequestContext,
        meter: ResponseMeter,
        mut target: PathBuf,
        headers: HeaderMap,
    ) -> Response<MeteredBody> {
        loop {
            if !self.resolver.contains(&target) {
                return self.serve_error(ctx, meter, &ServeError::NotFound);
            }

            let stat = match fs::symlink_metadata(&target).await {
                Ok(stat) => stat,
                Err(e) => {
                    let err = ServeError::from_io(FsOp::Lstat, &target, e);
                    return self.serve_error(ctx, meter, &err);
                }
            };

            let file_type = stat.file_type();
            if file_type.is_file() {
                // lstat follows links in parent directories; check where the
                // file really lives
                match fs::canonicalize(&target).await {
                    Ok(real) if self.resolver.contains(&real) => {}
                    Ok(_) => return self.serve_error(ctx, meter, &ServeError::NotFound),
                    Err(e) => {
                        let err = ServeError::from_io(FsOp::Resolve, &target, e);
                        return self.serve_error(ctx, meter, &err);
                    }
                }

                return match fs::File::open(&target).await {
                    Ok(file) => {
                        let headers = file_headers(headers, &target, &stat);
                        let response = response::build_file_response(headers, file);
                        self.metered(response, ctx, meter)
                    }
                    Err(e) => {
                        let err = ServeError::from_io(FsOp::Open, &target, e);
                        self.serve_error(ctx, meter, &err)
                    }
                };
            }

            if file_type.is_symlink() {
                // canonicalize follows the whole chain and never yields a symlink
                match fs::canonicalize(&target).await {
                    Ok(resolved) => {
                        target = resolved;
                        continue;
                    }
                    Err(e) => {
                        let err = ServeError::from_io(FsOp::Resolve, &target, e);
                        return self.serve_error(ctx, meter, &err);
                    }
                }
            }

            // Directories, devices, sockets, pipes
            return self.serve_error(ctx, meter, &ServeError::NotFound);
        }
    }

    /// Error response; the error line, if any, follows the access line
    fn serve_error(
        &self,
        ctx: RequestContext,
        meter: ResponseMeter,
        err: &ServeError,
    ) -> Response<MeteredBody> {
        let error_entry = err.detail().map(|detail| ErrorLogEntry::new(&ctx, detail));

        let response = match err.status() {
            StatusCode::NOT_FOUND => http::build_404_response(),
            _ => http::build_500_response(),
        };
        let response = self.metered(response, ctx, meter);
        match error_entry {
            Some(entry) => response.map(|body| body.with_error(entry)),
            None => response,
        }
    }

    fn metered(
        &self,
        response: Response<ResponseBody>,
        ctx: RequestContext,
        meter: ResponseMeter,
    ) -> Response<MeteredBody> {
        let status = response.status();
        let logs = Arc::clone(&self.logs);
        response.map(|body| MeteredBody::new(body, meter, logs, ctx, status))
    }
}

/// Fill in entity headers for a regular file
fn file_headers(mut headers: HeaderMap, path: &Path, stat: &Metadata) -> HeaderMap {
    if !headers.contains_key(CONTENT_ENCODING) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(stat.len()));
    }

    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(mime::get_content_type(path)),
        );
    }

    if let Ok(modified) = stat.modified() {
        if let Ok(value) = HeaderValue::from_str(&response::format_http_date(modified)) {
            headers.insert(LAST_MODIFIED, value);
        }
    }

    headers
}

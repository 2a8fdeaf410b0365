//! HTTP response building module
//!
//! Response bodies are boxed so file streams and fixed error pages share one
//! type.

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::{Response, StatusCode};
use std::io;
use std::time::SystemTime;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Read size when streaming a file
const FILE_CHUNK_SIZE: usize = 64 * 1024;

const NOT_FOUND_BODY: &str = "404 page not found\n";
const INTERNAL_ERROR_BODY: &str = "Internal Server Error\n";

pub type ResponseBody = http_body_util::combinators::UnsyncBoxBody<Bytes, io::Error>;

/// Body with fixed content
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body streaming `file` from its current position to EOF
pub fn file_body(file: File) -> ResponseBody {
    StreamBody::new(ReaderStream::with_capacity(file, FILE_CHUNK_SIZE).map_ok(Frame::data))
        .boxed_unsync()
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
}

fn build_text_response(status: StatusCode, text: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(full_body(text));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Build 200 OK response streaming `file` with the given headers
pub fn build_file_response(headers: HeaderMap, file: File) -> Response<ResponseBody> {
    let mut response = Response::new(file_body(file));
    *response.headers_mut() = headers;
    response
}

/// Format a timestamp as an RFC 1123 HTTP-date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

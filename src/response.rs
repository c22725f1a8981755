//! The response a request's chain writes into.
//!
//! Handlers and filters never build a response value; they write through the
//! [`Context`](crate::Context), which owns one [`Response`] per request. The
//! server turns it into an `http::Response` once the chain has returned.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use tracing::debug;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for [`Context::bytes`](crate::Context::bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Status, headers and body accumulated by one request.
///
/// The status is written once: the first explicit [`set_status`] wins, and
/// writing body bytes first commits `200 OK`. Later attempts are ignored.
///
/// [`set_status`]: Response::set_status
#[derive(Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `200 OK` if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Commits `status` unless one is already set. Returns whether it took.
    pub fn set_status(&mut self, status: StatusCode) -> bool {
        match self.status {
            Some(committed) => {
                debug!(committed = committed.as_u16(), ignored = status.as_u16(), "status already written");
                false
            }
            None => {
                self.status = Some(status);
                true
            }
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write(&mut self, data: &[u8]) {
        self.body_mut().extend_from_slice(data);
    }

    /// The body buffer, for encoders that write in place. Commits the status.
    pub(crate) fn body_mut(&mut self) -> &mut Vec<u8> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        &mut self.body
    }

    /// Sets `content-type` unless a handler already chose one.
    pub(crate) fn default_content_type(&mut self, content_type: &str) {
        if self.headers.contains_key(CONTENT_TYPE) {
            return;
        }
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
    }

    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Self { status: Some(status), ..Self::default() }
    }
}

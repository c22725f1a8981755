//! Error type and the error-handling capability.
//!
//! Build-time errors (`DuplicateRoute`, `IllegalPattern`, `UnsupportedMerge`)
//! come back from registration so startup can abort. Runtime parse failures
//! never abort a request: the [`Context`] logs them through the configured
//! [`ErrorHandler`] and carries on with empty data. A missing route is not an
//! error at all; the server runs its not-found handler instead.

use http::StatusCode;
use tracing::{debug, warn};

use crate::context::Context;

/// Boxed error produced by a [`Codec`](crate::Codec).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A handler is already bound at this pattern.
    #[error("duplicate route: {0}")]
    DuplicateRoute(String),

    #[error("illegal pattern `{pattern}`: {reason}")]
    IllegalPattern { pattern: String, reason: String },

    #[error("unsupported merge: {0}")]
    UnsupportedMerge(&'static str),

    #[error("malformed query string: {0}")]
    Query(String),

    #[error("malformed form body: {0}")]
    Form(String),

    #[error("multipart: {0}")]
    Multipart(#[from] multer::Error),

    #[error("no codec configured")]
    EmptyCodec,

    #[error("codec: {0}")]
    Codec(#[source] BoxError),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid socket address `{0}`")]
    Address(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// What a runtime failure was doing when it happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Query,
    Form,
    Multipart,
    Encode,
    /// Never logged by the crate, since [`Context::decode`] returns its
    /// errors. For handlers that log a decode failure themselves.
    Decode,
}

/// Decides how runtime errors are logged and answered.
///
/// The core never writes an error body itself; [`Context::error`] delegates
/// here.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Records a failure that did not stop the request.
    fn log(&self, ctx: &Context, kind: ErrorKind, err: &Error);

    /// Answers the request with `status`.
    fn handle(&self, ctx: &mut Context, status: StatusCode, err: Option<&Error>);
}

/// Logs with `tracing` and answers with a bare status.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn log(&self, ctx: &Context, kind: ErrorKind, err: &Error) {
        warn!(?kind, path = ctx.path(), "{err}");
    }

    fn handle(&self, ctx: &mut Context, status: StatusCode, err: Option<&Error>) {
        if let Some(err) = err {
            debug!(status = status.as_u16(), path = ctx.path(), "{err}");
        }
        ctx.status(status);
    }
}

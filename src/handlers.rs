//! Small reusable handlers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};

use crate::chain::Chain;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedFilter, BoxedHandler, Handler};

/// Answers with a bare status code.
#[derive(Clone, Copy, Debug)]
pub struct Status(pub StatusCode);

impl Handler for Status {
    fn handle(&self, ctx: &mut Context) {
        ctx.status(self.0);
    }
}

/// Dispatches on the request method; anything unregistered gets
/// `405 Method Not Allowed` with an `Allow` header.
///
/// ```text
/// app.route("/users/:id", Methods::new()
///     .on(Method::GET,    show_user)
///     .on(Method::DELETE, delete_user))?;
/// ```
#[derive(Clone, Default)]
pub struct Methods {
    routes: HashMap<Method, BoxedHandler>,
}

impl Methods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, handler: impl Handler) -> Self {
        self.routes.insert(method, Arc::new(handler));
        self
    }

    fn allow(&self) -> String {
        let mut methods: Vec<&str> = self.routes.keys().map(Method::as_str).collect();
        methods.sort_unstable();
        methods.join(", ")
    }
}

impl Handler for Methods {
    fn handle(&self, ctx: &mut Context) {
        match self.routes.get(ctx.method()) {
            Some(handler) => handler.handle(ctx),
            None => {
                if let Ok(allow) = HeaderValue::from_str(&self.allow()) {
                    ctx.set_header(ALLOW, allow);
                }
                ctx.status(StatusCode::METHOD_NOT_ALLOWED);
            }
        }
    }
}

/// Wraps `handler` in a fixed list of filters, outermost first.
///
/// The wrapped chain runs wherever the handler is mounted; every link sees
/// the params active at that point.
pub fn intercept(handler: impl Handler, filters: Vec<BoxedFilter>) -> Intercepted {
    Intercepted { handler: Arc::new(handler), filters }
}

/// A handler with its own filters. See [`intercept`].
pub struct Intercepted {
    handler: BoxedHandler,
    filters: Vec<BoxedFilter>,
}

impl Handler for Intercepted {
    fn handle(&self, ctx: &mut Context) {
        if self.filters.is_empty() {
            self.handler.handle(ctx);
        } else {
            Chain::fixed(&self.handler, &self.filters, ctx.params_arc()).run(ctx);
        }
    }
}

/// Serves files from disk for `GET` requests.
///
/// Either one fixed file, or a file under a root directory named by a path
/// capture:
///
/// ```text
/// app.route("/favicon.ico", Fs::file("public/favicon.ico"))?;
/// app.route("/static/*path", Fs::dir("public", "path"))?;
/// ```
///
/// Missing files answer `404`. So do directories, unless
/// [`allow_dir`](Fs::allow_dir) is set, in which case their `index.html` is
/// served. Captures containing `..` or other non-plain components never leave
/// the root. Any other I/O failure goes to the error handler as `500`.
#[derive(Clone, Debug)]
pub struct Fs {
    root: PathBuf,
    param: Option<String>,
    allow_dir: bool,
}

impl Fs {
    /// Always serves `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into(), param: None, allow_dir: false }
    }

    /// Serves `root` joined with the value of the `param` capture.
    pub fn dir(root: impl Into<PathBuf>, param: impl Into<String>) -> Self {
        Self { root: root.into(), param: Some(param.into()), allow_dir: false }
    }

    pub fn allow_dir(mut self, allow: bool) -> Self {
        self.allow_dir = allow;
        self
    }

    fn resolve(&self, ctx: &Context) -> Option<PathBuf> {
        let Some(param) = &self.param else {
            return Some(self.root.clone());
        };
        let mut path = self.root.clone();
        for component in Path::new(ctx.param(param)?).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// The file actually served and its contents, or `None` for a miss.
    fn read(&self, path: PathBuf) -> io::Result<Option<(PathBuf, Vec<u8>)>> {
        let path = match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() && self.allow_dir => path.join("index.html"),
            Ok(meta) if meta.is_dir() => return Ok(None),
            Ok(_) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        match fs::read(&path) {
            Ok(data) => Ok(Some((path, data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

impl Handler for Fs {
    fn handle(&self, ctx: &mut Context) {
        if *ctx.method() != Method::GET {
            ctx.set_header(ALLOW, HeaderValue::from_static("GET"));
            ctx.status(StatusCode::METHOD_NOT_ALLOWED);
            return;
        }
        let Some(path) = self.resolve(ctx) else {
            ctx.status(StatusCode::NOT_FOUND);
            return;
        };
        match self.read(path) {
            Ok(Some((served, data))) => {
                ctx.set_header(CONTENT_TYPE, HeaderValue::from_static(content_type(&served)));
                ctx.write(&data);
            }
            Ok(None) => ctx.status(StatusCode::NOT_FOUND),
            Err(e) => ctx.error(StatusCode::INTERNAL_SERVER_ERROR, Some(&Error::Io(e))),
        }
    }
}

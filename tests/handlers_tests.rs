use std::fs;
use std::sync::{Arc, Mutex};

use arbor::handlers::Fs;
use arbor::middleware::Jsonp;
use arbor::{Context, Env, Error, ErrorHandler, ErrorKind, Json, Response, RouterExt, Server, StatusCode};
use bytes::Bytes;
use serde_json::json;
use tempfile::TempDir;

/// Counts how often requests were answered through the error handler.
#[derive(Clone, Default)]
struct Failures(Arc<Mutex<Vec<StatusCode>>>);

impl ErrorHandler for Failures {
    fn log(&self, _ctx: &Context, _kind: ErrorKind, _err: &Error) {}

    fn handle(&self, ctx: &mut Context, status: StatusCode, _err: Option<&Error>) {
        self.0.lock().unwrap().push(status);
        ctx.status(status);
    }
}

fn public() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hello.txt"), "Hello\n").unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
    fs::write(dir.path().join("docs").join("app.css"), "body{}").unwrap();
    dir
}

fn files_server(dir: &TempDir, allow_dir: bool) -> Server {
    let mut server = Server::new(Env::new());
    let app = server.router_mut();
    app.route("/static/*path", Fs::dir(dir.path(), "path").allow_dir(allow_dir))
        .unwrap();
    app.route("/hello", Fs::file(dir.path().join("hello.txt"))).unwrap();
    server
}

fn call(server: &Server, method: &str, uri: &str) -> Response {
    let request = http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap();
    server.handle(request)
}

#[test]
fn serves_a_file_under_the_root() {
    let dir = public();
    let server = files_server(&dir, false);

    let response = call(&server, "GET", "/static/docs/app.css");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/css");
    assert_eq!(response.body(), b"body{}");
}

#[test]
fn serves_a_fixed_file() {
    let dir = public();
    let server = files_server(&dir, false);

    let response = call(&server, "GET", "/hello");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(response.body(), b"Hello\n");
}

#[test]
fn missing_file_is_404() {
    let dir = public();
    let server = files_server(&dir, false);

    let response = call(&server, "GET", "/static/nope.txt");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body().is_empty());
}

#[test]
fn directory_is_404_unless_allowed() {
    let dir = public();

    let response = call(&files_server(&dir, false), "GET", "/static/docs");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = call(&files_server(&dir, true), "GET", "/static/docs");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(response.body(), b"<h1>docs</h1>");
}

#[test]
fn parent_components_never_leave_the_root() {
    let dir = public();
    let inner = dir.path().join("docs");
    let mut server = Server::new(Env::new());
    server
        .router_mut()
        .route("/docs/*path", Fs::dir(&inner, "path"))
        .unwrap();

    assert!(dir.path().join("hello.txt").exists());
    let response = call(&server, "GET", "/docs/../hello.txt");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body().is_empty());
}

#[test]
fn only_get_is_served() {
    let dir = public();
    let server = files_server(&dir, false);

    let response = call(&server, "POST", "/static/docs/app.css");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET");
    assert!(response.body().is_empty());
}

#[cfg(unix)]
#[test]
fn io_failures_go_to_the_error_handler() {
    let dir = public();
    let failures = Failures::default();
    let mut server = Server::new(Env::new().with_error_handler(failures.clone()));
    // A path through a regular file fails with ENOTDIR, not ENOENT.
    server
        .router_mut()
        .route("/broken", Fs::file(dir.path().join("hello.txt").join("inner")))
        .unwrap();

    let response = call(&server, "GET", "/broken");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(*failures.0.lock().unwrap(), [StatusCode::INTERNAL_SERVER_ERROR]);
}

fn jsonp_server() -> Server {
    let mut server = Server::new(Env::new().with_codec(Json));
    let app = server.router_mut();
    app.filter("/api", Jsonp::new("callback")).unwrap();
    app.route("/api/users", |ctx: &mut Context| ctx.encode(&json!({"users": []})))
        .unwrap();
    server
}

#[test]
fn jsonp_wraps_get_responses() {
    let response = call(&jsonp_server(), "GET", "/api/users?callback=show");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/javascript");
    assert_eq!(response.body(), b"show({\"users\":[]}\n)");
}

#[test]
fn jsonp_leaves_other_requests_alone() {
    let server = jsonp_server();

    let plain = call(&server, "GET", "/api/users");
    assert_eq!(plain.headers()["content-type"], "application/json");
    assert_eq!(plain.body(), b"{\"users\":[]}\n");

    let post = call(&server, "POST", "/api/users?callback=show");
    assert_eq!(post.body(), b"{\"users\":[]}\n");

    let hostile = call(&server, "GET", "/api/users?callback=alert(1)");
    assert_eq!(hostile.body(), b"{\"users\":[]}\n");
}

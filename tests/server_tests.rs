use arbor::handlers::{Methods, Status};
use arbor::{
    Config, Context, DEFAULT_MAX_MEMORY, Env, Method, Next, RouteTable, RouterExt, Server,
    StatusCode, health,
};
use bytes::Bytes;
use http::HeaderValue;
use http::header::HeaderName;

fn request(method: &str, host: &str, uri: &str) -> http::Request<Bytes> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("host", host)
        .body(Bytes::new())
        .unwrap()
}

fn body(response: &arbor::Response) -> &str {
    std::str::from_utf8(response.body()).unwrap()
}

fn stamp(ctx: &mut Context, next: Next<'_>) {
    ctx.set_header(HeaderName::from_static("x-stamp"), HeaderValue::from_static("1"));
    next.run(ctx);
}

fn hello(ctx: &mut Context) {
    ctx.text("hello");
}

fn server() -> Server {
    let mut server = Server::new(Env::new());
    let app = server.router_mut();
    app.filter("/", stamp).unwrap();
    app.route("/hello", hello).unwrap();
    app.route("/healthz", health::liveness).unwrap();
    app.route("/readyz", health::readiness).unwrap();
    app.route("/gone", Status(StatusCode::GONE)).unwrap();
    app.route(
        "/items/:id",
        Methods::new()
            .on(Method::GET, hello)
            .on(Method::DELETE, Status(StatusCode::NO_CONTENT)),
    )
    .unwrap();
    server
}

#[test]
fn registered_route_answers() {
    let response = server().handle(request("GET", "localhost", "/hello"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response), "hello");
    assert_eq!(response.headers()["x-stamp"], "1");
}

#[test]
fn unmatched_path_is_404_after_filters() {
    let response = server().handle(request("GET", "localhost", "/nowhere"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-stamp"], "1");
}

#[test]
fn custom_not_found() {
    fn missing(ctx: &mut Context) {
        ctx.status(StatusCode::NOT_FOUND);
        ctx.text(format!("no route for {}", ctx.path()));
    }

    let server = server().with_not_found(missing);
    let response = server.handle(request("GET", "localhost", "/nowhere"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response), "no route for /nowhere");
}

#[test]
fn host_routers_take_precedence() {
    let mut server = server();
    let mut admin = RouteTable::new();
    admin
        .route("/hello", |ctx: &mut Context| ctx.text("admin"))
        .unwrap();
    server.host("admin.example.com", admin);

    let response = server.handle(request("GET", "Admin.Example.com:8443", "/hello"));
    assert_eq!(body(&response), "admin");

    // The host router has no filters of the default one.
    assert!(!response.headers().contains_key("x-stamp"));

    let response = server.handle(request("GET", "www.example.com", "/hello"));
    assert_eq!(body(&response), "hello");
}

#[test]
fn empty_host_replaces_the_default_router() {
    let mut server = server();
    let mut other = RouteTable::new();
    other.route("/only", hello).unwrap();
    server.host("", other);

    let found = server.handle(request("GET", "localhost", "/only"));
    assert_eq!(found.status(), StatusCode::OK);
    let gone = server.handle(request("GET", "localhost", "/hello"));
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[test]
fn methods_reject_unregistered_verbs() {
    let server = server();

    let response = server.handle(request("GET", "localhost", "/items/3"));
    assert_eq!(body(&response), "hello");

    let response = server.handle(request("DELETE", "localhost", "/items/3"));
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server.handle(request("PUT", "localhost", "/items/3"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "DELETE, GET");
}

#[test]
fn status_handler_and_probes() {
    let server = server();

    let gone = server.handle(request("GET", "localhost", "/gone"));
    assert_eq!(gone.status(), StatusCode::GONE);
    assert!(gone.body().is_empty());

    let live = server.handle(request("GET", "localhost", "/healthz"));
    assert_eq!(body(&live), "ok");
    let ready = server.handle(request("GET", "localhost", "/readyz"));
    assert_eq!(body(&ready), "ready");
}

#[test]
fn env_from_config() {
    let config = Config::from_toml("[upload]\nmax_memory = 1024\n").unwrap();
    assert_eq!(Env::from_config(&config).max_memory(), 1024);
    assert_eq!(Env::from_config(&Config::default()).max_memory(), DEFAULT_MAX_MEMORY);
    assert_eq!(Env::from_config(&Config::default()).max_body(), DEFAULT_MAX_MEMORY);
    assert_eq!(Env::from_config(&config).max_body(), 1024);
}

#[test]
fn bad_config_is_an_error() {
    assert!(matches!(
        Config::from_toml("addr = 3"),
        Err(arbor::Error::Config(_))
    ));
}

#[tokio::test]
async fn serve_rejects_a_bad_address() {
    let err = server().serve("not an address").await.unwrap_err();
    assert!(matches!(err, arbor::Error::Address(_)));
}

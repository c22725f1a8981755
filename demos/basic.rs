//! Minimal arbor example: versioned JSON endpoints behind scoped filters.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/v1/users/42
//!   curl -X POST http://localhost:3000/api/v1/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/files/index.html        # served from ./public
//!   curl 'http://localhost:3000/api/v1/users/42?callback=show'
//!   curl http://localhost:3000/healthz

use arbor::handlers::{Fs, Methods};
use arbor::{
    Config, Context, Env, Json, Method, Next, RouteTable, Router, RouterExt, Server, StatusCode,
    health, middleware,
};
use serde_json::{Value, json};

fn main() -> Result<(), arbor::Error> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut server = Server::new(Env::from_config(&config).with_codec(Json));

    let app = server.router_mut();
    app.filter("/", middleware::trace)?;
    app.filter("/api", middleware::Jsonp::new("callback"))?;
    app.route("/healthz", health::liveness)?;
    app.route("/readyz", health::readiness)?;
    app.route("/files/*path", Fs::dir("public", "path"))?;

    // Built separately, then grafted under /api.
    let mut api = RouteTable::new();
    {
        let mut versioned = api.group("/:version");
        versioned.filter("", check_version)?;
        versioned.route(
            "/users",
            Methods::new().on(Method::POST, create_user),
        )?;
        versioned.route(
            "/users/:id",
            Methods::new()
                .on(Method::GET, get_user)
                .on(Method::DELETE, delete_user),
        )?;
    }
    app.merge("/api", Box::new(api))?;

    tokio::runtime::Runtime::new()?.block_on(server.serve(&config.addr))
}

// Filter on /api/:version sees `version`, never the inner `id`.
fn check_version(ctx: &mut Context, next: Next<'_>) {
    if ctx.param("version") != Some("v1") {
        ctx.status(StatusCode::NOT_FOUND);
        ctx.text("unknown api version");
        return;
    }
    next.run(ctx);
}

// GET /api/:version/users/:id
fn get_user(ctx: &mut Context) {
    let id = ctx.param("id").unwrap_or("unknown").to_owned();
    ctx.encode(&json!({ "id": id, "name": "alice" }));
}

// POST /api/:version/users
fn create_user(ctx: &mut Context) {
    let input: Value = match ctx.decode() {
        Ok(v) => v,
        Err(e) => {
            ctx.error(StatusCode::BAD_REQUEST, Some(&e));
            return;
        }
    };
    ctx.status(StatusCode::CREATED);
    ctx.encode(&json!({ "id": "99", "name": input["name"] }));
}

// DELETE /api/:version/users/:id → 204 No Content
fn delete_user(ctx: &mut Context) {
    ctx.status(StatusCode::NO_CONTENT);
}


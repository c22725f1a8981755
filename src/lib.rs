//! # arbor
//!
//! A path-tree HTTP router with scoped middleware filters.
//!
//! ## The model
//!
//! Routes live in a segment trie. A node can hold a handler, a list of
//! filters, or both. A request walks the trie once and collects every filter
//! it passes, root first, then the handler where it stops:
//!
//! ```text
//! /api            filters: [auth]
//! /api/:version   filters: [negotiate]
//! /api/:version/users/:id   handler: show_user
//!
//! GET /api/2/users/42  →  auth  →  negotiate  →  show_user
//!                         {}       {version}     {version, id}
//! ```
//!
//! Each link sees only the path params captured up to the node it was
//! registered on, and the previous set is restored when the link returns.
//!
//! - Static segments beat `:params`, which beat `*wildcards`.
//! - Registration errors come back as [`Error`]; lookups never fail.
//! - Handlers and filters are synchronous and write through a [`Context`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use arbor::{Context, Env, Next, RouterExt, Server, StatusCode, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arbor::Error> {
//!     let mut server = Server::new(Env::default());
//!     let app = server.router_mut();
//!     app.filter("/", middleware::trace)?;
//!     app.filter("/admin", require_token)?;
//!     app.route("/users/:id", show_user)?;
//!
//!     server.serve("0.0.0.0:3000").await
//! }
//!
//! fn require_token(ctx: &mut Context, next: Next<'_>) {
//!     if ctx.header("authorization").is_none() {
//!         ctx.status(StatusCode::UNAUTHORIZED);
//!         return;
//!     }
//!     next.run(ctx);
//! }
//!
//! fn show_user(ctx: &mut Context) {
//!     let id = ctx.param("id").unwrap_or("unknown").to_owned();
//!     ctx.text(format!("user {id}"));
//! }
//! ```

mod chain;
mod codec;
mod config;
mod context;
mod env;
mod error;
mod form;
mod handler;
mod params;
mod response;
mod router;
mod server;
mod tree;

pub mod handlers;
pub mod health;
pub mod middleware;

pub use chain::{Chain, Next};
pub use codec::{Codec, Decoder, Encoder, Json};
pub use config::{Config, UploadConfig};
pub use context::Context;
pub use env::{DEFAULT_MAX_MEMORY, Env};
pub use error::{BoxError, DefaultErrorHandler, Error, ErrorHandler, ErrorKind};
pub use form::{FilePart, MultipartForm, Values};
pub use handler::{BoxedFilter, BoxedHandler, Filter, Handler};
pub use params::Params;
pub use response::{ContentType, Response};
pub use router::{Group, MatchedFilter, MatchedHandler, RouteTable, Router, RouterExt};
pub use server::Server;
pub use tree::{PathSegment, PathTree};

pub use http::{Method, StatusCode};

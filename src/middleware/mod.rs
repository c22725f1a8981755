//! Built-in filters.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection and
//! authentication-header inspection. Every filter here is a plain
//! [`Filter`](crate::Filter), registered like any other:
//!
//! ```text
//! app.filter("/", middleware::trace)?;
//! app.filter("/api", middleware::Jsonp::new("callback"))?;
//! ```

mod jsonp;
mod trace;

pub use jsonp::Jsonp;
pub use trace::trace;

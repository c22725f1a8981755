//! JSONP wrapping for `GET` responses.

use http::Method;
use http::header::{CONTENT_TYPE, HeaderValue};

use crate::chain::Next;
use crate::context::Context;
use crate::handler::Filter;

/// Wraps the inner response body as `callback(body)` when the query string
/// carries a callback name under the configured key.
///
/// ```text
/// app.filter("/api", Jsonp::new("callback"))?;
/// // GET /api/users?callback=show  →  show({"users":[]})
/// ```
///
/// Only `GET` requests are wrapped. A callback that is not a dotted
/// identifier (`[A-Za-z0-9_$.]`, not starting with a digit) is ignored and
/// the response passes through untouched.
#[derive(Clone, Debug)]
pub struct Jsonp {
    key: String,
}

impl Jsonp {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

fn valid_callback(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}

impl Filter for Jsonp {
    fn filter(&self, ctx: &mut Context, next: Next<'_>) {
        if *ctx.method() != Method::GET {
            next.run(ctx);
            return;
        }
        let callback = match ctx.query_value(&self.key) {
            Some(name) if valid_callback(name) => name.to_owned(),
            _ => {
                next.run(ctx);
                return;
            }
        };

        next.run(ctx);

        let response = ctx.response_mut();
        let body = std::mem::take(response.body_mut());
        let wrapped = response.body_mut();
        wrapped.extend_from_slice(callback.as_bytes());
        wrapped.push(b'(');
        wrapped.extend_from_slice(&body);
        wrapped.push(b')');
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/javascript"));
    }
}

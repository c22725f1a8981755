//! Handler and filter capabilities, and their type-erased forms.
//!
//! # How handlers are stored
//!
//! The path tree holds handlers and filters of *different* concrete types in
//! the same nodes, so both are stored as trait objects behind an `Arc`:
//!
//! ```text
//! fn show_user(ctx: &mut Context) { … }          ← user writes this
//!        ↓ router.route("/users/:id", show_user)
//! Arc::new(show_user)                            ← BoxedHandler = Arc<dyn Handler>
//!        ↓
//! handler.handle(&mut ctx)  at request time      ← one vtable dispatch
//! ```
//!
//! Matching hands out `Arc` clones, so a request never borrows from the tree
//! beyond the lookup itself.
//!
//! Both capabilities are synchronous: the server buffers the request body
//! before dispatch, and handlers produce their response by writing into the
//! [`Context`].

use std::sync::Arc;

use crate::chain::Next;
use crate::context::Context;

/// The terminal link of a dispatch chain.
///
/// Implemented for every `Fn(&mut Context)`, so plain functions and closures
/// work directly:
///
/// ```text
/// fn hello(ctx: &mut Context) {
///     ctx.text("hello");
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// Middleware wrapped around a handler.
///
/// A filter either calls [`Next::run`] exactly once to continue, or drops
/// `next` to short-circuit: nothing nested inside it runs. `Next` is consumed
/// by `run`, so calling it twice does not compile.
///
/// ```text
/// fn require_token(ctx: &mut Context, next: Next<'_>) {
///     if ctx.header("authorization").is_none() {
///         ctx.status(StatusCode::UNAUTHORIZED);
///         return;
///     }
///     next.run(ctx);
/// }
/// ```
pub trait Filter: Send + Sync + 'static {
    fn filter(&self, ctx: &mut Context, next: Next<'_>);
}

impl<F> Filter for F
where
    F: Fn(&mut Context, Next<'_>) + Send + Sync + 'static,
{
    fn filter(&self, ctx: &mut Context, next: Next<'_>) {
        self(ctx, next)
    }
}

/// A type-erased handler shared between the tree and in-flight requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// A type-erased filter shared between the tree and in-flight requests.
pub type BoxedFilter = Arc<dyn Filter>;

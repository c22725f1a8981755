//! Per-request dispatch chain.
//!
//! A [`Chain`] is built fresh for each request from the matched filters
//! (outermost first) and the terminal handler. Running it installs each
//! link's own params as the context's active set, calls the link, and puts
//! the previous set back when the link returns, whether or not the link
//! continued. The active params therefore always belong to the registration
//! depth of whatever code is currently running.

use std::sync::Arc;

use crate::context::Context;
use crate::handler::{BoxedFilter, BoxedHandler};
use crate::params::Params;
use crate::router::{MatchedFilter, MatchedHandler};

pub struct Chain {
    filters: Vec<MatchedFilter>,
    handler: BoxedHandler,
    params: Arc<Params>,
}

impl Chain {
    pub fn new(handler: BoxedHandler, params: Arc<Params>, filters: Vec<MatchedFilter>) -> Self {
        Self { filters, handler, params }
    }

    /// Builds a chain from a router lookup. An empty match runs `fallback`
    /// with no params, after the filters found along the path.
    pub fn from_match(
        matched: MatchedHandler,
        filters: Vec<MatchedFilter>,
        fallback: &BoxedHandler,
    ) -> Self {
        match matched.handler {
            Some(handler) => Self::new(handler, matched.params, filters),
            None => Self::new(Arc::clone(fallback), Arc::default(), filters),
        }
    }

    /// Wraps `handler` with `filters`, every link sharing `params`.
    pub(crate) fn fixed(handler: &BoxedHandler, filters: &[BoxedFilter], params: Arc<Params>) -> Self {
        let filters = filters
            .iter()
            .map(|filter| MatchedFilter { filter: Arc::clone(filter), params: Arc::clone(&params) })
            .collect();
        Self::new(Arc::clone(handler), params, filters)
    }

    pub fn run(&self, ctx: &mut Context) {
        Next { chain: self, index: 0 }.run(ctx);
    }
}

/// The rest of the chain, handed to a [`Filter`](crate::Filter).
pub struct Next<'a> {
    chain: &'a Chain,
    index: usize,
}

impl Next<'_> {
    /// Runs the remaining links, then restores the caller's params.
    pub fn run(self, ctx: &mut Context) {
        let chain = self.chain;
        let previous = match chain.filters.get(self.index) {
            Some(link) => {
                let previous = ctx.replace_params(Arc::clone(&link.params));
                link.filter.filter(ctx, Next { chain, index: self.index + 1 });
                previous
            }
            None => {
                let previous = ctx.replace_params(Arc::clone(&chain.params));
                chain.handler.handle(ctx);
                previous
            }
        };
        ctx.replace_params(previous);
    }
}

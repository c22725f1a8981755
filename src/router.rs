//! Route registration and lookup.
//!
//! [`RouteTable`] owns a [`PathTree`]; [`Group`] is a prefix-rewriting view
//! over a table. Both implement [`Router`], the surface the server talks to.
//!
//! Registration happens once, from one owner, before the router is handed to
//! a [`Server`](crate::Server). After that only the `match_*` methods run, and
//! they take `&self`, so the built table is shared across request tasks
//! without locks.

use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxedFilter, BoxedHandler, Filter, Handler};
use crate::params::Params;
use crate::tree::PathTree;

/// The handler found for a path, with the params captured up to its node.
///
/// `handler` is `None` when nothing is bound where the walk ends.
#[derive(Clone, Default)]
pub struct MatchedHandler {
    pub handler: Option<BoxedHandler>,
    pub params: Arc<Params>,
}

impl MatchedHandler {
    pub fn is_found(&self) -> bool {
        self.handler.is_some()
    }
}

/// A filter found along a path, with the params captured up to the node it
/// was registered on.
#[derive(Clone)]
pub struct MatchedFilter {
    pub filter: BoxedFilter,
    pub params: Arc<Params>,
}

/// Build-time registration plus serve-time lookup.
///
/// Registration errors are returned, never panicked, so startup code can
/// fail fast with `?`. Lookups never fail: absence is an empty result.
pub trait Router: Send + Sync {
    /// Binds `handler` at `pattern`.
    fn add(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error>;

    /// Appends `filters` at `pattern`, in order.
    fn add_filters(&mut self, pattern: &str, filters: Vec<BoxedFilter>) -> Result<(), Error>;

    /// A view whose every call prefixes its path with `prefix`.
    fn group(&mut self, prefix: &str) -> Box<dyn Router + '_>;

    /// Grafts `other`'s routes under `prefix`. Only routers that own their
    /// tree can be merged; groups and foreign routers fail with
    /// [`Error::UnsupportedMerge`].
    ///
    /// A merge that fails on a clash is not rolled back: routes grafted
    /// before the clash stay registered. Treat the error as fatal.
    fn merge(&mut self, prefix: &str, other: Box<dyn Router + '_>) -> Result<(), Error>;

    fn match_handler(&self, path: &str) -> MatchedHandler;

    fn match_filters(&self, path: &str) -> Vec<MatchedFilter>;

    fn match_handler_and_filters(&self, path: &str) -> (MatchedHandler, Vec<MatchedFilter>);

    /// Gives up ownership of the underlying tree, for [`merge`](Router::merge).
    fn into_tree(self: Box<Self>) -> Result<PathTree, Error> {
        Err(Error::UnsupportedMerge("router does not own a path tree"))
    }
}

/// Generic shortcuts over [`Router::add`] and [`Router::add_filters`].
///
/// ```text
/// let mut app = RouteTable::new();
/// app.filter("/api", middleware::trace)?;
/// app.route("/api/:version/users/:id", show_user)?;
/// ```
pub trait RouterExt: Router {
    fn route(&mut self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.add(pattern, Arc::new(handler))
    }

    fn filter(&mut self, pattern: &str, filter: impl Filter) -> Result<(), Error> {
        self.add_filters(pattern, vec![Arc::new(filter)])
    }
}

impl<R: Router + ?Sized> RouterExt for R {}

/// The owning router: one path tree, built once at startup.
#[derive(Default)]
pub struct RouteTable {
    tree: PathTree,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for RouteTable {
    fn add(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        self.tree.add(pattern, handler)?;
        debug!(pattern, "route registered");
        Ok(())
    }

    fn add_filters(&mut self, pattern: &str, filters: Vec<BoxedFilter>) -> Result<(), Error> {
        let count = filters.len();
        self.tree.add_filters(pattern, filters)?;
        debug!(pattern, count, "filters registered");
        Ok(())
    }

    fn group(&mut self, prefix: &str) -> Box<dyn Router + '_> {
        Box::new(Group { prefix: prefix.to_owned(), table: self })
    }

    fn merge(&mut self, prefix: &str, other: Box<dyn Router + '_>) -> Result<(), Error> {
        let tree = other.into_tree()?;
        self.tree.graft(prefix, tree)?;
        debug!(prefix, "router merged");
        Ok(())
    }

    fn match_handler(&self, path: &str) -> MatchedHandler {
        self.tree.match_one(path)
    }

    fn match_filters(&self, path: &str) -> Vec<MatchedFilter> {
        self.tree.match_all(path)
    }

    fn match_handler_and_filters(&self, path: &str) -> (MatchedHandler, Vec<MatchedFilter>) {
        self.tree.match_both(path)
    }

    fn into_tree(self: Box<Self>) -> Result<PathTree, Error> {
        Ok(self.tree)
    }
}

/// A prefix view over a [`RouteTable`].
///
/// Nesting groups concatenates prefixes; every group points straight at the
/// table, never at another group.
pub struct Group<'a> {
    prefix: String,
    table: &'a mut RouteTable,
}

impl Group<'_> {
    fn full(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }
}

impl Router for Group<'_> {
    fn add(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let pattern = self.full(pattern);
        self.table.add(&pattern, handler)
    }

    fn add_filters(&mut self, pattern: &str, filters: Vec<BoxedFilter>) -> Result<(), Error> {
        let pattern = self.full(pattern);
        self.table.add_filters(&pattern, filters)
    }

    fn group(&mut self, prefix: &str) -> Box<dyn Router + '_> {
        Box::new(Group { prefix: self.full(prefix), table: &mut *self.table })
    }

    fn merge(&mut self, prefix: &str, other: Box<dyn Router + '_>) -> Result<(), Error> {
        let prefix = self.full(prefix);
        self.table.merge(&prefix, other)
    }

    fn match_handler(&self, path: &str) -> MatchedHandler {
        self.table.match_handler(&self.full(path))
    }

    fn match_filters(&self, path: &str) -> Vec<MatchedFilter> {
        self.table.match_filters(&self.full(path))
    }

    fn match_handler_and_filters(&self, path: &str) -> (MatchedHandler, Vec<MatchedFilter>) {
        self.table.match_handler_and_filters(&self.full(path))
    }

    fn into_tree(self: Box<Self>) -> Result<PathTree, Error> {
        Err(Error::UnsupportedMerge("a group is a view over another router and cannot be merged"))
    }
}

//! Segment trie backing every [`RouteTable`](crate::RouteTable).
//!
//! Each node owns its static children, at most one `:param` child and at
//! most one `*wildcard` child, plus an optional handler and an ordered list of
//! filters. Nodes are created on demand during registration and never
//! removed. Matching is read-only, so a built tree can be shared across
//! request tasks without locking.
//!
//! At every level the walk prefers, in order: an exact static child, the
//! parameter child, the wildcard child. The walk never backtracks, so
//! `/user/static` always outranks `/user/:id` for the literal path.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxedFilter, BoxedHandler};
use crate::params::Params;
use crate::router::{MatchedFilter, MatchedHandler};

/// One `/`-delimited unit of a route pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Matches the literal text exactly.
    Static(String),
    /// `:name`: matches exactly one non-empty segment.
    Param(String),
    /// `*name`: matches the rest of the path. Only valid as the last segment.
    Wildcard(String),
}

impl PathSegment {
    /// Splits a pattern into segments. Empty segments are skipped, so
    /// `/a//b/` and `/a/b` are the same pattern.
    pub fn parse_pattern(pattern: &str) -> Result<Vec<PathSegment>, Error> {
        let mut segments = Vec::new();
        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            if matches!(segments.last(), Some(PathSegment::Wildcard(_))) {
                return Err(illegal(pattern, "a wildcard must be the last segment"));
            }
            let segment = if let Some(name) = raw.strip_prefix(':') {
                if name.is_empty() {
                    return Err(illegal(pattern, "parameter name is empty"));
                }
                PathSegment::Param(name.to_owned())
            } else if let Some(name) = raw.strip_prefix('*') {
                if name.is_empty() {
                    return Err(illegal(pattern, "wildcard name is empty"));
                }
                PathSegment::Wildcard(name.to_owned())
            } else {
                PathSegment::Static(raw.to_owned())
            };
            segments.push(segment);
        }
        Ok(segments)
    }
}

fn illegal(pattern: &str, reason: impl Into<String>) -> Error {
    Error::IllegalPattern {
        pattern: pattern.to_owned(),
        reason: reason.into(),
    }
}

/// The route trie: handlers and filters keyed by path pattern.
#[derive(Default)]
pub struct PathTree {
    root: Node,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` at `pattern`. A node's handler is set once; a second
    /// registration fails with [`Error::DuplicateRoute`] and keeps the first.
    pub fn add(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let segments = PathSegment::parse_pattern(pattern)?;
        let node = self.root.descend(pattern, &segments)?;
        if node.handler.is_some() {
            return Err(Error::DuplicateRoute(pattern.to_owned()));
        }
        node.handler = Some(handler);
        Ok(())
    }

    /// Appends `filters` to the node at `pattern`, after any already there.
    pub fn add_filters(
        &mut self,
        pattern: &str,
        filters: impl IntoIterator<Item = BoxedFilter>,
    ) -> Result<(), Error> {
        let segments = PathSegment::parse_pattern(pattern)?;
        let node = self.root.descend(pattern, &segments)?;
        node.filters.extend(filters);
        Ok(())
    }

    /// Moves every node of `other` under `prefix`.
    ///
    /// Handlers meeting on the same node fail with [`Error::DuplicateRoute`];
    /// filter lists are concatenated, existing filters first.
    pub fn graft(&mut self, prefix: &str, other: PathTree) -> Result<(), Error> {
        let segments = PathSegment::parse_pattern(prefix)?;
        if segments.iter().any(|s| matches!(s, PathSegment::Wildcard(_))) {
            return Err(illegal(prefix, "cannot merge under a wildcard segment"));
        }
        let node = self.root.descend(prefix, &segments)?;
        node.absorb(other.root, prefix.trim_end_matches('/'))
    }

    /// The handler bound where the walk over `path` ends, with the params
    /// captured along the way. Empty when the walk dead-ends or the final
    /// node has no handler.
    pub fn match_one(&self, path: &str) -> MatchedHandler {
        self.root
            .walk(path, |_, _| {})
            .map(Node::matched)
            .unwrap_or_default()
    }

    /// Every filter on every node the walk over `path` visits, root first.
    /// Each carries the params captured up to its own node.
    pub fn match_all(&self, path: &str) -> Vec<MatchedFilter> {
        let mut filters = Vec::new();
        self.root
            .walk(path, |node, params| node.collect_filters(params, &mut filters));
        filters
    }

    /// [`match_one`](Self::match_one) and [`match_all`](Self::match_all) in a
    /// single walk.
    pub fn match_both(&self, path: &str) -> (MatchedHandler, Vec<MatchedFilter>) {
        let mut filters = Vec::new();
        let handler = self
            .root
            .walk(path, |node, params| node.collect_filters(params, &mut filters))
            .map(Node::matched)
            .unwrap_or_default();
        (handler, filters)
    }
}

#[derive(Default)]
struct Node {
    statics: HashMap<String, Node>,
    param: Option<Box<Capture>>,
    wildcard: Option<Box<Capture>>,
    handler: Option<BoxedHandler>,
    filters: Vec<BoxedFilter>,
}

/// A `:name` or `*name` child together with the name it binds.
struct Capture {
    name: String,
    node: Node,
}

impl Node {
    /// Walks `segments`, creating missing nodes.
    fn descend(&mut self, pattern: &str, segments: &[PathSegment]) -> Result<&mut Node, Error> {
        let mut node = self;
        for segment in segments {
            node = match segment {
                PathSegment::Static(literal) => node.statics.entry(literal.clone()).or_default(),
                PathSegment::Param(name) => Node::capture(&mut node.param, name, pattern)?,
                PathSegment::Wildcard(name) => Node::capture(&mut node.wildcard, name, pattern)?,
            };
        }
        Ok(node)
    }

    fn capture<'n>(
        slot: &'n mut Option<Box<Capture>>,
        name: &str,
        pattern: &str,
    ) -> Result<&'n mut Node, Error> {
        let capture = slot.get_or_insert_with(|| {
            Box::new(Capture { name: name.to_owned(), node: Node::default() })
        });
        if capture.name != name {
            return Err(illegal(
                pattern,
                format!("`{name}` conflicts with `{}` at the same position", capture.name),
            ));
        }
        Ok(&mut capture.node)
    }

    fn absorb(&mut self, other: Node, at: &str) -> Result<(), Error> {
        if let Some(handler) = other.handler {
            if self.handler.is_some() {
                let route = if at.is_empty() { "/" } else { at };
                return Err(Error::DuplicateRoute(route.to_owned()));
            }
            self.handler = Some(handler);
        }
        self.filters.extend(other.filters);
        for (literal, child) in other.statics {
            let at = format!("{at}/{literal}");
            self.statics.entry(literal).or_default().absorb(child, &at)?;
        }
        Node::absorb_capture(&mut self.param, other.param, ':', at)?;
        Node::absorb_capture(&mut self.wildcard, other.wildcard, '*', at)
    }

    fn absorb_capture(
        slot: &mut Option<Box<Capture>>,
        other: Option<Box<Capture>>,
        sigil: char,
        at: &str,
    ) -> Result<(), Error> {
        let Some(other) = other else { return Ok(()) };
        let Capture { name, node } = *other;
        let at = format!("{at}/{sigil}{name}");
        match slot {
            None => {
                *slot = Some(Box::new(Capture { name, node }));
                Ok(())
            }
            Some(capture) if capture.name == name => capture.node.absorb(node, &at),
            Some(capture) => Err(illegal(
                &at,
                format!("`{name}` conflicts with `{}` at the same position", capture.name),
            )),
        }
    }

    /// Follows `path` from this node, calling `visit` on every node entered
    /// (this one included). Returns the final node and its captures only if
    /// the whole path was consumed.
    fn walk<'t>(
        &'t self,
        path: &str,
        mut visit: impl FnMut(&'t Node, &Params),
    ) -> Option<(&'t Node, Params)> {
        let mut node = self;
        let mut params = Params::new();
        let mut rest = path;
        visit(node, &params);
        loop {
            rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                return Some((node, params));
            }
            let (segment, tail) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
            if let Some(child) = node.statics.get(segment) {
                node = child;
                rest = tail;
            } else if let Some(capture) = &node.param {
                params.push(&capture.name, segment);
                node = &capture.node;
                rest = tail;
            } else if let Some(capture) = &node.wildcard {
                params.push(&capture.name, rest);
                node = &capture.node;
                rest = "";
            } else {
                return None;
            }
            visit(node, &params);
        }
    }

    fn matched((node, params): (&Node, Params)) -> MatchedHandler {
        match &node.handler {
            Some(handler) => MatchedHandler {
                handler: Some(Arc::clone(handler)),
                params: Arc::new(params),
            },
            None => MatchedHandler::default(),
        }
    }

    fn collect_filters(&self, params: &Params, out: &mut Vec<MatchedFilter>) {
        if self.filters.is_empty() {
            return;
        }
        let params = Arc::new(params.clone());
        out.extend(self.filters.iter().map(|filter| MatchedFilter {
            filter: Arc::clone(filter),
            params: Arc::clone(&params),
        }));
    }
}

//! HTTP server, host routing and graceful shutdown.
//!
//! # Two phases
//!
//! A [`Server`] is built mutably: register routes on the default router,
//! attach per-host routers, choose a not-found handler. [`Server::serve`]
//! then takes it by value and shares it immutably across connection tasks,
//! so no registration can race with matching.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::chain::Chain;
use crate::context::Context;
use crate::env::Env;
use crate::error::{BoxError, Error};
use crate::handler::{BoxedHandler, Handler};
use crate::response::Response;
use crate::router::{RouteTable, Router};

/// Answers through the environment's error handler with `404 Not Found`.
fn not_found(ctx: &mut Context) {
    ctx.error(StatusCode::NOT_FOUND, None);
}

/// The HTTP server.
pub struct Server {
    default_router: Box<dyn Router>,
    hosts: HashMap<String, Box<dyn Router>>,
    env: Arc<Env>,
    not_found: BoxedHandler,
}

impl Server {
    pub fn new(env: Env) -> Self {
        Self {
            default_router: Box::new(RouteTable::new()),
            hosts: HashMap::new(),
            env: Arc::new(env),
            not_found: Arc::new(not_found),
        }
    }

    /// Runs when no handler matches. Filters found along the path still run
    /// first.
    pub fn with_not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Arc::new(handler);
        self
    }

    /// The router used for hosts without one of their own.
    pub fn router_mut(&mut self) -> &mut dyn Router {
        &mut *self.default_router
    }

    /// Routes requests for `host` to `router`. The empty host replaces the
    /// default router.
    pub fn host(&mut self, host: &str, router: impl Router + 'static) {
        if host.is_empty() {
            self.default_router = Box::new(router);
        } else {
            self.hosts.insert(host.to_ascii_lowercase(), Box::new(router));
        }
    }

    /// The router serving `host`, falling back to the default one.
    pub fn router(&self, host: &str) -> &dyn Router {
        match self.hosts.get(&host.to_ascii_lowercase()) {
            Some(router) => router.as_ref(),
            None => self.default_router.as_ref(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Routes one buffered request and runs its chain to completion.
    pub fn handle(&self, request: http::Request<Bytes>) -> Response {
        let router = self.router(request_host(&request).unwrap_or(""));
        let (handler, filters) = router.match_handler_and_filters(request.uri().path());
        let chain = Chain::from_match(handler, filters, &self.not_found);

        let mut ctx = Context::new(request, Arc::clone(&self.env));
        chain.run(&mut ctx);
        ctx.into_response()
    }

    /// Starts accepting connections on `addr` and dispatching them.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, addr: &str) -> Result<(), Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::Address(addr.to_owned()))?;
        let listener = TcpListener::bind(addr).await?;

        // Shared read-only from here on: the build phase is over.
        let server = Arc::new(self);

        info!(%addr, "arbor listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let server = Arc::clone(&server);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let server = Arc::clone(&server);
                            async move { dispatch(server, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("arbor stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers the body up to the environment's `max_body`, then runs the
/// synchronous chain. All failures become responses, so hyper never sees an
/// error: an oversized body is `413`, an unreadable one `400`.
async fn dispatch<B>(
    server: Arc<Server>,
    req: http::Request<B>,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(server.env.max_body()).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(path = parts.uri.path(), limit, "request body too large");
            return Ok(Response::from(StatusCode::PAYLOAD_TOO_LARGE).into_http());
        }
        Err(e) => {
            warn!(path = parts.uri.path(), "failed to read request body: {e}");
            return Ok(Response::from(StatusCode::BAD_REQUEST).into_http());
        }
    };

    let response = server.handle(http::Request::from_parts(parts, body));
    Ok(response.into_http())
}

/// Host name from the `Host` header or the URI authority, without the port.
fn request_host<B>(request: &http::Request<B>) -> Option<&str> {
    let host = request
        .headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())?;
    Some(strip_port(host))
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep the brackets, drop anything after them.
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

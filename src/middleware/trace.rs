//! Per-request tracing span.

use std::time::Instant;

use tracing::{info, info_span};

use crate::chain::Next;
use crate::context::Context;

/// Opens a span carrying the method and path, runs the rest of the chain
/// inside it, then logs the final status and latency.
pub fn trace(ctx: &mut Context, next: Next<'_>) {
    let span = info_span!("request", method = %ctx.method(), path = ctx.path());
    let _entered = span.enter();
    let started = Instant::now();

    next.run(ctx);

    info!(
        status = ctx.response().status().as_u16(),
        latency_us = started.elapsed().as_micros() as u64,
        "request completed"
    );
}

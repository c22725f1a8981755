//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them like any handler:
//!
//! ```text
//! app.route("/healthz", health::liveness)?;
//! app.route("/readyz", health::readiness)?;
//! ```
//!
//! Replace `readiness` with your own handler if the pod must wait on
//! dependencies before taking traffic.

use crate::context::Context;

/// Always `200 OK` with body `"ok"`.
pub fn liveness(ctx: &mut Context) {
    ctx.text("ok");
}

/// `200 OK` with body `"ready"`.
pub fn readiness(ctx: &mut Context) {
    ctx.text("ready");
}

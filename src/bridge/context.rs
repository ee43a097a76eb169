//! Carries the routed [`Request`] inside an [`rpc::Context`](Context).
//!
//! RPC middleware has no dependency on the router, yet sometimes needs the
//! request it is running for (headers, matched route). The adapter stores it
//! here before entering the chain.

use crate::request::Request;
use crate::rpc::Context;

struct RouteKey;

/// Derives a context that carries `req`.
pub fn store(ctx: &Context, req: Request) -> Context {
    ctx.with_value::<RouteKey, Request>(req)
}

/// The request stored by [`store`], if any.
pub fn retrieve(ctx: &Context) -> Option<Request> {
    ctx.value::<RouteKey, Request>().cloned()
}

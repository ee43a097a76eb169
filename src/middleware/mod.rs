//! Route middleware.
//!
//! A route owns an ordered stack of middleware followed by its handler.
//! Each middleware receives the request and a [`Next`] that runs the rest of
//! the stack:
//!
//! ```text
//! layer 0 ─▶ layer 1 ─▶ … ─▶ handler
//!    ◀──────────◀──────────◀── Response
//! ```
//!
//! Any `async fn(Request, Next) -> Response` is a middleware:
//!
//! ```rust
//! use tsu_rpc::{Next, Request, Response};
//!
//! async fn stamp(req: Request, next: Next) -> Response {
//!     let mut res = next.run(req).await;
//!     res.headers_mut().insert("x-served-by", "tsu".parse().unwrap());
//!     res
//! }
//! ```
//!
//! For RPC-style middleware chains see [`bridge::middlewares`](crate::bridge::middlewares).

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

/// A route middleware.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        Box::pin(self(req, next))
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of a route's chain.
///
/// Cloning is cheap: the stack itself is shared. Running a clone replays the
/// remainder from the same position.
#[derive(Clone)]
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    handler: BoxedHandler,
    index: usize,
}

impl Next {
    pub(crate) fn new(stack: Arc<[BoxedMiddleware]>, handler: BoxedHandler) -> Self {
        Self { stack, handler, index: 0 }
    }

    /// Runs the next middleware, or the handler once the stack is exhausted.
    pub fn run(self, req: Request) -> BoxFuture<Response> {
        match self.stack.get(self.index) {
            Some(layer) => {
                let layer = Arc::clone(layer);
                let next = Next { index: self.index + 1, ..self };
                layer.call(req, next)
            }
            None => self.handler.call(req),
        }
    }

    /// How many middleware are still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.stack.len().saturating_sub(self.index)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("remaining", &self.remaining()).finish()
    }
}

//! Runs a route's remaining chain inside an RPC middleware chain.
//!
//! Per request the adapter:
//!
//! 1. stores the request in a fresh [`Context`] and, when the request was
//!    routed, sets the operation to the matched route pattern;
//! 2. calls the composed chain once, with an innermost handler that runs the
//!    rest of the route chain;
//! 3. if the route answered with a status of 400 or above, hands the chain a
//!    synthesized error carrying that status and an unknown reason;
//! 4. returns the route's response unchanged.
//!
//! The response exists before the chain unwinds, so middleware can observe
//! the outcome (log it, trace it, count it) but cannot reshape it. A
//! middleware that returns without calling inward does not stop the route:
//! its result is logged and the route runs anyway. The synthesized error is
//! coarse: it carries the status only, not whatever detail the route wrote
//! into the body.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::{HeaderMap, StatusCode};
use tokio::sync::oneshot;
use tracing::debug;

use crate::bridge::context;
use crate::bridge::responder::Responder;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::rpc::errors::{self, UNKNOWN_REASON};
use crate::rpc::{self, BoxError, Context, Payload, transport};

/// What the innermost handler replies with once the route has answered.
///
/// The body is already committed; only status and headers are exposed.
#[derive(Debug, Clone)]
pub struct WrittenResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// A route middleware wrapping an RPC middleware chain.
///
/// Built by [`middlewares`].
#[derive(Clone)]
pub struct RpcMiddleware {
    chain: rpc::Middleware,
    responder: Arc<Responder>,
}

/// Composes `middlewares` (first = outermost) into a route middleware.
///
/// ```rust,no_run
/// use tsu_rpc::{Request, Response, Router, bridge, rpc};
///
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .layer(bridge::middlewares([
///         rpc::middleware::recovery(),
///         rpc::middleware::logging(),
///     ]))
///     .get("/users/{id}", get_user);
/// ```
pub fn middlewares(middlewares: impl IntoIterator<Item = rpc::Middleware>) -> RpcMiddleware {
    RpcMiddleware {
        chain: rpc::middleware::chain(middlewares),
        responder: Arc::new(Responder::default()),
    }
}

impl RpcMiddleware {
    /// Sets the responder used when the route started but never answered.
    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responder = Arc::new(responder);
        self
    }
}

impl Middleware for RpcMiddleware {
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        let chain = Arc::clone(&self.chain);
        let responder = Arc::clone(&self.responder);

        Box::pin(async move {
            let ctx = context::store(&Context::background(), req.clone());
            let ctx = match context::retrieve(&ctx).as_ref().and_then(Request::full_path) {
                Some(route) => transport::set_operation(&ctx, route),
                None => ctx,
            };

            let (tx, mut rx) = oneshot::channel();
            let entered = Arc::new(AtomicBool::new(false));
            let inner = {
                let req = req.clone();
                let next = next.clone();
                let entered = Arc::clone(&entered);
                rpc::middleware::handler(move |_ctx: Context, _payload: Payload| async move {
                    entered.store(true, Ordering::Release);
                    let res = next.run(req).await;
                    let written = WrittenResponse {
                        status: res.status_code(),
                        headers: res.headers().clone(),
                    };
                    // The receiver lives until the chain has returned.
                    let _ = tx.send(res);
                    observed(written)
                })
            };

            let result = chain(inner)(ctx, Box::new(req.clone())).await;

            if let Ok(res) = rx.try_recv() {
                return res;
            }

            if !entered.load(Ordering::Acquire) {
                // The chain never reached the route. Its verdict is observational.
                match &result {
                    Err(err) => debug!(path = req.path(), "rpc chain failed without running the route: {err}"),
                    Ok(_) => debug!(path = req.path(), "rpc chain returned without running the route"),
                }
                return next.run(req).await;
            }

            // The route started but never answered: it panicked and the chain caught it.
            match result {
                Err(err) => responder.error(&req, Some(&*err)),
                Ok(_) => {
                    let err = errors::Error::internal_server(UNKNOWN_REASON, "route produced no response");
                    responder.error(&req, Some(&err))
                }
            }
        })
    }
}

/// Reply for the chain, or the error a failing status stands for.
fn observed(written: WrittenResponse) -> Result<Payload, BoxError> {
    let status = written.status.as_u16();
    if status >= 400 {
        return Err(errors::Error::new(i32::from(status), UNKNOWN_REASON, UNKNOWN_REASON).into());
    }
    Ok(Box::new(written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use http::Method;

    use crate::router::Router;
    use crate::rpc::Handler;
    use crate::rpc::middleware::{from_fn, recovery};

    #[derive(Default)]
    struct Seen {
        operation: Option<String>,
        request_path: Option<String>,
        error: Option<errors::Error>,
        reply_status: Option<StatusCode>,
    }

    /// Records what the chain observed around the route.
    fn recorder(seen: Arc<Mutex<Seen>>) -> rpc::Middleware {
        from_fn(move |ctx: Context, req: Payload, next: Handler| {
            let seen = Arc::clone(&seen);
            async move {
                {
                    let mut seen = seen.lock().unwrap();
                    seen.operation = transport::operation(&ctx).map(str::to_owned);
                    seen.request_path = context::retrieve(&ctx).map(|r| r.path().to_owned());
                }
                let result = next(ctx, req).await;
                let mut seen = seen.lock().unwrap();
                match &result {
                    Ok(reply) => {
                        seen.reply_status = reply.downcast_ref::<WrittenResponse>().map(|w| w.status);
                    }
                    Err(err) => seen.error = Some(errors::from_error(&**err)),
                }
                result
            }
        })
    }

    async fn user(req: Request) -> Response {
        Response::text(format!("user {}", req.param("id").unwrap_or("-")))
    }

    async fn missing(_req: Request) -> Response {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .json(r#"{"detail":"kept"}"#)
    }

    async fn boom(_req: Request) -> Response {
        panic!("route exploded")
    }

    fn get(path: &str) -> Request {
        Request::builder(Method::GET, path).build()
    }

    #[tokio::test]
    async fn failing_status_reaches_middleware_as_error() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .layer(middlewares([recorder(Arc::clone(&seen))]))
            .get("/things/{id}", missing);

        let res = app.handle(get("/things/9")).await;

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), br#"{"detail":"kept"}"#);
        let seen = seen.lock().unwrap();
        let err = seen.error.as_ref().unwrap();
        assert_eq!(err.code, 404);
        assert_eq!(err.reason, UNKNOWN_REASON);
        assert!(seen.reply_status.is_none());
    }

    #[tokio::test]
    async fn operation_and_request_are_visible() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .layer(middlewares([recorder(Arc::clone(&seen))]))
            .get("/users/{id}", user);

        let res = app.handle(get("/users/42")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"user 42");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.operation.as_deref(), Some("/users/{id}"));
        assert_eq!(seen.request_path.as_deref(), Some("/users/42"));
        assert_eq!(seen.reply_status, Some(StatusCode::OK));
        assert!(seen.error.is_none());
    }

    #[tokio::test]
    async fn chain_runs_once_per_request() {
        let calls = Arc::new(Mutex::new(0));
        let counter = {
            let calls = Arc::clone(&calls);
            from_fn(move |ctx: Context, req: Payload, next: Handler| {
                *calls.lock().unwrap() += 1;
                next(ctx, req)
            })
        };
        let app = Router::new().layer(middlewares([counter])).get("/users/{id}", user);

        app.handle(get("/users/1")).await;
        app.handle(get("/users/2")).await;
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn rejecting_middleware_does_not_stop_route() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let deny = from_fn(|_ctx: Context, _req: Payload, _next: Handler| async move {
            Err::<Payload, BoxError>(errors::Error::unauthorized("NO_TOKEN", "missing token").into())
        });
        let ran = Arc::new(AtomicBool::new(false));
        let route = {
            let ran = Arc::clone(&ran);
            move |_req: Request| {
                let ran = Arc::clone(&ran);
                async move {
                    ran.store(true, Ordering::SeqCst);
                    Response::text("served")
                }
            }
        };
        let app = Router::new()
            .layer(middlewares([recorder(Arc::clone(&seen)), deny]))
            .get("/users/{id}", route);

        let res = app.handle(get("/users/1")).await;

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"served");
        assert_eq!(seen.lock().unwrap().error.as_ref().unwrap().reason, "NO_TOKEN");
    }

    #[tokio::test]
    async fn skipping_middleware_still_runs_route() {
        let skip = from_fn(|_ctx: Context, req: Payload, _next: Handler| async move { Ok::<Payload, BoxError>(req) });
        let app = Router::new().layer(middlewares([skip])).get("/users/{id}", user);

        let res = app.handle(get("/users/5")).await;
        assert_eq!(res.body(), b"user 5");
    }

    #[tokio::test]
    async fn recovery_turns_route_panic_into_500() {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .layer(middlewares([recorder(Arc::clone(&seen)), recovery()]))
            .get("/boom", boom);

        let res = app.handle(get("/boom")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.content_type(), Some("application/json"));
        assert_eq!(seen.lock().unwrap().error.as_ref().unwrap().code, 500);
    }

    fn written(status: StatusCode) -> WrittenResponse {
        WrittenResponse { status, headers: HeaderMap::new() }
    }

    #[test]
    fn success_statuses_pass_through() {
        for status in [StatusCode::OK, StatusCode::NO_CONTENT, StatusCode::FOUND] {
            let reply = observed(written(status)).unwrap();
            assert_eq!(reply.downcast_ref::<WrittenResponse>().unwrap().status, status);
        }
    }

    #[test]
    fn failing_statuses_become_unknown_errors() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND, StatusCode::BAD_GATEWAY] {
            let err = observed(written(status)).unwrap_err();
            let normalized = errors::from_error(&*err);
            assert_eq!(normalized.code, i32::from(status.as_u16()));
            assert_eq!(normalized.reason, UNKNOWN_REASON);
            assert_eq!(normalized.message, UNKNOWN_REASON);
        }
    }
}

//! Functional middleware chains.
//!
//! A [`Handler`] takes a context and a payload and eventually yields a reply
//! payload or an error. A [`Middleware`] wraps one handler in another. Chains
//! are built once and applied to a fresh innermost handler per call:
//!
//! ```text
//! chain([a, b, c])(inner)  ==  a(b(c(inner)))
//! ```
//!
//! so `a` sees the call first and the result last.
//!
//! Payloads are type-erased; middleware that cares downcasts them.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::handler::BoxFuture;
use crate::rpc::{Context, errors, transport};

/// Boxed error flowing through a chain.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased request or reply.
pub type Payload = Box<dyn Any + Send>;

/// One call. Consumed when invoked.
pub type Handler = Box<dyn FnOnce(Context, Payload) -> BoxFuture<Result<Payload, BoxError>> + Send>;

/// Wraps a handler in another.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Composes `middlewares` into one; the first listed is the outermost.
pub fn chain(middlewares: impl IntoIterator<Item = Middleware>) -> Middleware {
    let stack: Vec<Middleware> = middlewares.into_iter().collect();
    Arc::new(move |inner: Handler| stack.iter().rev().fold(inner, |next, m| m(next)))
}

/// Boxes an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: FnOnce(Context, Payload) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
{
    Box::new(move |ctx: Context, req: Payload| -> BoxFuture<Result<Payload, BoxError>> {
        Box::pin(f(ctx, req))
    })
}

/// Builds a middleware from an async closure that receives the next handler.
///
/// ```rust
/// use tsu_rpc::rpc::middleware::from_fn;
///
/// let passthrough = from_fn(|ctx, req, next| async move { next(ctx, req).await });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Context, Payload, Handler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, BoxError>> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| -> Handler {
        let f = Arc::clone(&f);
        Box::new(move |ctx: Context, req: Payload| -> BoxFuture<Result<Payload, BoxError>> {
            Box::pin(f(ctx, req, next))
        })
    })
}

/// One structured event per call: operation, code, reason and latency.
///
/// Successful calls log at `info`, failed ones at `warn`.
pub fn logging() -> Middleware {
    from_fn(|ctx: Context, req: Payload, next: Handler| async move {
        let operation = transport::operation(&ctx).unwrap_or_default().to_owned();
        let start = Instant::now();

        let result = next(ctx, req).await;
        let latency = start.elapsed().as_secs_f64();

        let err: Option<&(dyn std::error::Error + 'static)> = match &result {
            Ok(_) => None,
            Err(e) => Some(&**e),
        };
        let code = errors::code(err);
        match err {
            None => info!(kind = "server", %operation, code, latency, "request"),
            Some(e) => warn!(
                kind = "server",
                %operation,
                code,
                reason = %errors::reason(err),
                error = %e,
                latency,
                "request failed",
            ),
        }
        result
    })
}

/// Reason of the error [`recovery`] answers with.
pub const PANIC_REASON: &str = "UNKNOWN";

/// Turns a panic in the wrapped handler into a 500 error.
pub fn recovery() -> Middleware {
    from_fn(|ctx: Context, req: Payload, next: Handler| async move {
        let operation = transport::operation(&ctx).unwrap_or_default().to_owned();
        match AssertUnwindSafe(async move { next(ctx, req).await }).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                error!(%operation, panic = panic_message(&*panic), "handler panicked");
                Err(errors::Error::internal_server(PANIC_REASON, "unknown request error").into())
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware {
        from_fn(move |ctx: Context, req: Payload, next: Handler| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}>"));
                let result = next(ctx, req).await;
                log.lock().unwrap().push(format!("<{name}"));
                result
            }
        })
    }

    fn echo() -> Handler {
        handler(|_ctx, req| async move { Ok::<Payload, BoxError>(req) })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let composed = chain([
            recorder("a", Arc::clone(&log)),
            recorder("b", Arc::clone(&log)),
            recorder("c", Arc::clone(&log)),
        ]);

        let reply = composed(echo())(Context::background(), Box::new(7u8)).await.unwrap();
        assert_eq!(reply.downcast_ref::<u8>(), Some(&7));
        assert_eq!(*log.lock().unwrap(), ["a>", "b>", "c>", "<c", "<b", "<a"]);
    }

    #[tokio::test]
    async fn empty_chain_is_identity() {
        let reply = chain([])(echo())(Context::background(), Box::new("x")).await.unwrap();
        assert_eq!(reply.downcast_ref::<&str>(), Some(&"x"));
    }

    #[tokio::test]
    async fn middleware_sees_context_values() {
        let seen = Arc::new(Mutex::new(None));
        let probe = {
            let seen = Arc::clone(&seen);
            from_fn(move |ctx: Context, req: Payload, next: Handler| {
                *seen.lock().unwrap() = transport::operation(&ctx).map(str::to_owned);
                next(ctx, req)
            })
        };

        let ctx = transport::set_operation(&Context::background(), "/ping");
        chain([probe])(echo())(ctx, Box::new(())).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("/ping"));
    }

    #[tokio::test]
    async fn recovery_converts_panics() {
        let boom = handler(|_ctx, _req| async move {
            if true {
                panic!("kaboom");
            }
            Ok::<Payload, BoxError>(Box::new(()))
        });

        let err = chain([recovery()])(boom)(Context::background(), Box::new(()))
            .await
            .unwrap_err();
        let status = errors::from_error(&*err);
        assert_eq!(status.code, 500);
        assert_eq!(status.reason, PANIC_REASON);
    }

    #[tokio::test]
    async fn logging_passes_results_through() {
        let failing = handler(|_ctx, _req| async move {
            Err::<Payload, BoxError>(errors::Error::not_found("NF", "missing").into())
        });
        let err = chain([logging()])(failing)(Context::background(), Box::new(()))
            .await
            .unwrap_err();
        assert_eq!(errors::from_error(&*err).code, 404);

        let ok = chain([logging()])(echo())(Context::background(), Box::new(1i32)).await;
        assert!(ok.is_ok());
    }
}

//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Each route remembers the
//! pattern it was registered under and the middleware stack that was active
//! when it was added.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

struct Route {
    pattern: Arc<str>,
    stack: Arc<[BoxedMiddleware]>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Route>>>,
    layers: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), layers: Vec::new() }
    }

    /// Adds a middleware to every route registered *after* this call.
    ///
    /// ```rust,no_run
    /// # use tsu_rpc::{Request, Response, Router, bridge, rpc};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .layer(bridge::middlewares([rpc::middleware::logging()]))
    ///     .get("/users/{id}", get_user);
    /// ```
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler)
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.add(Method::DELETE, path, handler)
    }

    fn add(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = Arc::new(Route {
            pattern: Arc::from(path),
            stack: Arc::from(self.layers.clone()),
            handler: handler.into_boxed_handler(),
        });
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Routes one request through its chain and returns the response.
    ///
    /// Unmatched requests get `404 Not Found` without running any middleware.
    pub async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((route, params)) => {
                let req = req.matched(Arc::clone(&route.pattern), params);
                Next::new(Arc::clone(&route.stack), Arc::clone(&route.handler))
                    .run(req)
                    .await
            }
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(Arc<Route>, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let route = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((route, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;

    async fn echo_route(req: Request) -> Response {
        let body = format!("{}|{}", req.full_path().unwrap_or("-"), req.param("id").unwrap_or("-"));
        Response::text(body)
    }

    async fn tag(req: Request, next: Next) -> Response {
        let mut res = next.run(req).await;
        res.headers_mut().insert("x-layer", http::HeaderValue::from_static("1"));
        res
    }

    #[tokio::test]
    async fn matched_pattern_reaches_handler() {
        let app = Router::new().get("/users/{id}", echo_route);
        let res = app.handle(Request::builder(Method::GET, "/users/42").build()).await;
        assert_eq!(res.body(), b"/users/{id}|42");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let app = Router::new().get("/users/{id}", echo_route);
        let res = app.handle(Request::builder(Method::GET, "/nope").build()).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        let res = app.handle(Request::builder(Method::POST, "/users/1").build()).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn layers_apply_to_later_routes_only() {
        let app = Router::new()
            .get("/before", echo_route)
            .layer(tag)
            .get("/after", echo_route);

        let before = app.handle(Request::builder(Method::GET, "/before").build()).await;
        let after = app.handle(Request::builder(Method::GET, "/after").build()).await;
        assert!(before.headers().get("x-layer").is_none());
        assert_eq!(after.headers()["x-layer"], "1");
    }
}

//! Incoming HTTP request type.
//!
//! A [`Request`] is a cheap handle: cloning it bumps one reference count and
//! every clone points at the same parsed request. That is what lets the RPC
//! bridge stash the request in an [`rpc::Context`](crate::rpc::Context) while
//! the route chain keeps running with its own copy.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};

/// An incoming HTTP request, matched against a route.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    path: String,
    full_path: Option<Arc<str>>,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        full_path: Option<Arc<str>>,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner { method, path, full_path, headers, body, params }),
        }
    }

    /// Starts a request outside the server, e.g. for [`Router::handle`](crate::Router::handle).
    pub fn builder(method: Method, path: &str) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.inner.method }
    pub fn path(&self) -> &str { &self.inner.path }
    pub fn headers(&self) -> &HeaderMap { &self.inner.headers }
    pub fn body(&self) -> &[u8] { &self.inner.body }

    /// The route pattern this request matched, e.g. `/users/{id}`.
    ///
    /// `None` until the router has matched the request.
    pub fn full_path(&self) -> Option<&str> {
        self.inner.full_path.as_deref()
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a repeated header, in arrival order.
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner.headers
            .get_all(name)
            .into_iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get(key).map(String::as_str)
    }

    /// True when both handles point at the same underlying request.
    pub fn same(a: &Request, b: &Request) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Re-issues the request with the route match filled in.
    pub(crate) fn matched(self, full_path: Arc<str>, params: HashMap<String, String>) -> Self {
        let inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| Inner {
            method: shared.method.clone(),
            path: shared.path.clone(),
            full_path: shared.full_path.clone(),
            headers: shared.headers.clone(),
            body: shared.body.clone(),
            params: shared.params.clone(),
        });
        Self {
            inner: Arc::new(Inner { full_path: Some(full_path), params, ..inner }),
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .field("full_path", &self.inner.full_path)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Request`] by hand. Mostly useful in tests.
pub struct RequestBuilder {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    /// Appends a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request::new(self.method, self.path, None, self.headers, self.body, HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::builder(Method::GET, "/")
            .header("Accept", "application/json")
            .build();
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("ACCEPT"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn repeated_headers_keep_order() {
        let req = Request::builder(Method::GET, "/")
            .header("accept", "text/plain")
            .header("accept", "application/x-yaml")
            .build();
        let values: Vec<_> = req.header_values("accept").collect();
        assert_eq!(values, ["text/plain", "application/x-yaml"]);
    }

    #[test]
    fn clones_share_identity() {
        let req = Request::builder(Method::GET, "/").build();
        let other = Request::builder(Method::GET, "/").build();
        assert!(Request::same(&req, &req.clone()));
        assert!(!Request::same(&req, &other));
    }

    #[test]
    fn matched_sets_route_and_params() {
        let req = Request::builder(Method::GET, "/users/7").build();
        assert_eq!(req.full_path(), None);

        let params = HashMap::from([("id".to_owned(), "7".to_owned())]);
        let req = req.matched(Arc::from("/users/{id}"), params);
        assert_eq!(req.full_path(), Some("/users/{id}"));
        assert_eq!(req.param("id"), Some("7"));
    }
}

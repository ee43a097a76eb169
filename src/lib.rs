//! # tsu-rpc
//!
//! A minimal HTTP router whose routes can run inside RPC-style middleware
//! chains and answer errors in the RPC wire format.
//!
//! Two worlds meet here:
//!
//! - **Routing** — radix-tree routes ([`matchit`]), per-route middleware
//!   ([`Middleware`], [`Next`]), hyper underneath, graceful shutdown.
//! - **RPC conventions** ([`rpc`]) — a derived [`rpc::Context`], functional
//!   middleware chains, a normalized `(code, reason, message)` error, content
//!   codecs negotiated from `Accept`, protocol-message JSON.
//!
//! The [`bridge`] joins them: a route middleware that runs the route inside
//! an RPC chain, and a [`bridge::Responder`] that writes replies and errors.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_rpc::bridge::{self, Json, Responder};
//! use tsu_rpc::rpc::{self, errors};
//! use tsu_rpc::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .layer(bridge::middlewares([
//!             rpc::middleware::recovery(),
//!             rpc::middleware::logging(),
//!         ]))
//!         .get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let responder = Responder::negotiated();
//!     match req.param("id") {
//!         Some("42") => responder.success(&req, Some(&Json(serde_json::json!({"id": 42})))),
//!         _ => responder.error(&req, Some(&errors::Error::not_found("USER_NOT_FOUND", "no such user"))),
//!     }
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod bridge;
pub mod middleware;
pub mod rpc;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use middleware::{Middleware, Next};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

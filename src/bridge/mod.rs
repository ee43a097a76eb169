//! The shim between routes and RPC conventions.
//!
//! - [`context`] — carry the routed request inside an [`rpc::Context`](crate::rpc::Context)
//! - [`Responder`] — write replies and errors the RPC way
//! - [`middlewares`] — run RPC middleware around a route
//! - [`validate`] — optional self-validation

mod adapter;
mod config;
mod responder;
mod validate;

pub mod context;

pub use adapter::{RpcMiddleware, WrittenResponse, middlewares};
pub use config::{BridgeConfig, EncodingPolicy};
pub use responder::{Json, Reply, Responder, content_type};
pub use validate::{Validate, Validator, validate};

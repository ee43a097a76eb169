//! RPC-side conventions: context, middleware chains, the normalized error
//! model, content codecs and protocol-message JSON.
//!
//! These are the contracts the [`bridge`](crate::bridge) consumes. They know
//! nothing about routing.

mod context;

pub mod codec;
pub mod errors;
pub mod message;
pub mod middleware;
pub mod transport;

pub use context::Context;
pub use middleware::{BoxError, Handler, Middleware, Payload};

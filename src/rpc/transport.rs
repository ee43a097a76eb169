//! Transport facts carried in a [`Context`].
//!
//! The *operation* names what is being called. Logging and tracing
//! middleware key their output on it; for HTTP routes it is the matched
//! route pattern.

use crate::rpc::Context;

struct OperationKey;

/// Derives a context whose operation is `operation`.
pub fn set_operation(ctx: &Context, operation: impl Into<String>) -> Context {
    ctx.with_value::<OperationKey, String>(operation.into())
}

/// The operation of `ctx`, if one was set.
pub fn operation(ctx: &Context) -> Option<&str> {
    ctx.value::<OperationKey, String>().map(String::as_str)
}

//! The normalized error model.
//!
//! Every error that crosses the RPC boundary is reduced to a
//! `(code, reason, message, metadata)` record. `code` doubles as the HTTP
//! status, `reason` is a stable machine-readable token and `message` is for
//! humans.
//!
//! ```rust
//! use tsu_rpc::rpc::errors::{self, Error};
//!
//! let err = Error::not_found("USER_NOT_FOUND", "no user 42");
//! let io = std::io::Error::other("disk on fire");
//!
//! assert_eq!(errors::from_error(&err).code, 404);
//! assert_eq!(errors::from_error(&io).code, errors::UNKNOWN_CODE);
//! ```

use std::collections::BTreeMap;
use std::error::Error as StdError;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Code given to errors that carry no code of their own.
pub const UNKNOWN_CODE: i32 = 500;

/// Reason given to errors that carry no reason of their own.
pub const UNKNOWN_REASON: &str = "";

/// A normalized error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("error: code = {code} reason = {reason} message = {message} metadata = {metadata:?}")]
pub struct Error {
    pub code: i32,
    pub reason: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Error {
    pub fn new(code: i32, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn bad_request(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(400, reason, message)
    }

    pub fn unauthorized(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(401, reason, message)
    }

    pub fn forbidden(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(403, reason, message)
    }

    pub fn not_found(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(404, reason, message)
    }

    pub fn conflict(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(409, reason, message)
    }

    pub fn internal_server(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(500, reason, message)
    }

    pub fn service_unavailable(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(503, reason, message)
    }

    pub fn gateway_timeout(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(504, reason, message)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `code` as an HTTP status; codes HTTP cannot express become 500.
    pub fn status_code(&self) -> StatusCode {
        u16::try_from(self.code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Same code and reason. Message and metadata are ignored.
    pub fn is(&self, other: &Error) -> bool {
        self.code == other.code && self.reason == other.reason
    }
}

/// Normalizes any error.
///
/// The first [`Error`] found walking the `source()` chain is returned as is.
/// Anything else becomes [`UNKNOWN_CODE`] with the error's text as message.
pub fn from_error(err: &(dyn StdError + 'static)) -> Error {
    find(err)
        .cloned()
        .unwrap_or_else(|| Error::new(UNKNOWN_CODE, UNKNOWN_REASON, err.to_string()))
}

fn find<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(normalized) = e.downcast_ref::<Error>() {
            return Some(normalized);
        }
        current = e.source();
    }
    None
}

/// The code of an optional error; no error reads as 200.
pub fn code(err: Option<&(dyn StdError + 'static)>) -> i32 {
    err.map_or(200, |e| from_error(e).code)
}

/// The reason of an optional error; no error reads as [`UNKNOWN_REASON`].
pub fn reason(err: Option<&(dyn StdError + 'static)>) -> String {
    err.map_or_else(|| UNKNOWN_REASON.to_owned(), |e| from_error(e).reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("lookup failed")]
    struct Wrapped(#[source] Error);

    #[test]
    fn normalized_error_passes_through() {
        let err = Error::bad_request("BAD_NAME", "name is empty").with_metadata("field", "name");
        let got = from_error(&err);
        assert_eq!(got, err);
        assert_eq!(got.metadata["field"], "name");
    }

    #[test]
    fn normalized_error_found_in_source_chain() {
        let err = Wrapped(Error::not_found("USER_NOT_FOUND", "gone"));
        let got = from_error(&err);
        assert_eq!(got.code, 404);
        assert_eq!(got.reason, "USER_NOT_FOUND");
    }

    #[test]
    fn foreign_error_becomes_unknown() {
        let err = std::io::Error::other("disk on fire");
        let got = from_error(&err);
        assert_eq!(got.code, UNKNOWN_CODE);
        assert_eq!(got.reason, UNKNOWN_REASON);
        assert_eq!(got.message, "disk on fire");
    }

    #[test]
    fn status_code_falls_back_to_500() {
        assert_eq!(Error::new(404, "", "").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::new(-1, "", "").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::new(42, "", "").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn wire_form_omits_empty_metadata() {
        let json = serde_json::to_value(Error::not_found("NF", "missing")).unwrap();
        assert_eq!(json, serde_json::json!({"code": 404, "reason": "NF", "message": "missing"}));
    }

    #[test]
    fn optional_helpers() {
        let err = Error::forbidden("NOPE", "");
        assert_eq!(code(None), 200);
        assert_eq!(code(Some(&err)), 403);
        assert_eq!(reason(Some(&err)), "NOPE");
        assert_eq!(reason(None), "");
        assert!(err.is(&Error::forbidden("NOPE", "other message")));
    }
}

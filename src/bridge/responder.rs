//! Writes replies and errors the RPC way.
//!
//! One [`Responder`] covers both encodings a service may want:
//!
//! - [`EncodingPolicy::Negotiated`]: the error is normalized, encoded with
//!   the codec the client accepts, and the normalized code is the status.
//! - [`EncodingPolicy::FixedJson`]: the error is normalized and written as
//!   JSON under `500`, whatever its own code.
//!
//! Successful replies are JSON under either policy.

use std::error::Error as StdError;

use http::StatusCode;
use serde::Serialize;
use tracing::warn;

use crate::bridge::config::{BridgeConfig, EncodingPolicy};
use crate::request::Request;
use crate::response::Response;
use crate::rpc::BoxError;
use crate::rpc::codec::{self, Codecs};
use crate::rpc::errors;
use crate::rpc::message::{Empty, MarshalOptions, Message};

const BASE_CONTENT_TYPE: &str = "application";

/// `application/<subtype>`.
pub fn content_type(subtype: &str) -> String {
    format!("{BASE_CONTENT_TYPE}/{subtype}")
}

/// A successful result.
///
/// Protocol messages implement it through [`Message`]; anything
/// serde-serializable goes through [`Json`].
pub trait Reply {
    /// The protocol message behind this reply, if it is one.
    fn as_message(&self) -> Option<&dyn Message> {
        None
    }

    /// Generic JSON encoding.
    fn to_json(&self) -> Result<Vec<u8>, BoxError>;
}

impl<M: Message> Reply for M {
    fn as_message(&self) -> Option<&dyn Message> {
        Some(self)
    }

    fn to_json(&self) -> Result<Vec<u8>, BoxError> {
        Ok(MarshalOptions::default().marshal(self)?)
    }
}

/// Serializes the wrapped value with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> Reply for Json<T> {
    fn to_json(&self) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

/// Encodes replies and errors into [`Response`]s.
#[derive(Debug, Clone)]
pub struct Responder {
    policy: EncodingPolicy,
    codecs: Codecs,
    accept_header: String,
}

impl Responder {
    pub fn new(policy: EncodingPolicy) -> Self {
        Self::from_config(&BridgeConfig { policy, ..BridgeConfig::default() })
    }

    pub fn negotiated() -> Self {
        Self::new(EncodingPolicy::Negotiated)
    }

    pub fn fixed_json() -> Self {
        Self::new(EncodingPolicy::FixedJson)
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            policy: config.policy,
            codecs: Codecs::default(),
            accept_header: config.accept_header.clone(),
        }
    }

    /// Replaces the codec registry used for negotiation.
    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    /// Encodes `err` as the answer to `req`. No error means an empty `200`.
    ///
    /// If encoding fails the answer is a bare `500`.
    pub fn error(&self, req: &Request, err: Option<&(dyn StdError + 'static)>) -> Response {
        let Some(err) = err else {
            return Response::status(StatusCode::OK);
        };
        let normalized = errors::from_error(err);

        match self.policy {
            EncodingPolicy::Negotiated => {
                let codec = self.codecs.for_request(req, &self.accept_header);
                match codec::marshal(codec.as_ref(), &normalized) {
                    Ok(body) => Response::builder()
                        .status(normalized.status_code())
                        .bytes(&content_type(codec.name()), body),
                    Err(e) => {
                        warn!(codec = codec.name(), code = normalized.code, "error encoding failed: {e}");
                        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }
            }
            EncodingPolicy::FixedJson => match serde_json::to_vec(&normalized) {
                Ok(body) => Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .json(body),
                Err(e) => {
                    warn!(code = normalized.code, "error encoding failed: {e}");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
        }
    }

    /// Encodes a successful reply as JSON under `200`.
    ///
    /// No reply is answered as [`Empty`]. Protocol messages keep their
    /// default-valued fields. Encoding failures go through [`error`](Self::error).
    pub fn success(&self, req: &Request, reply: Option<&dyn Reply>) -> Response {
        let reply = reply.unwrap_or(&Empty);
        let encoded = match reply.as_message() {
            Some(message) => {
                let opts = MarshalOptions { emit_unpopulated: true, ..MarshalOptions::default() };
                opts.marshal(message).map_err(BoxError::from)
            }
            None => reply.to_json(),
        };

        match encoded {
            Ok(body) => Response::json(body),
            Err(e) => self.error(req, Some(&*e)),
        }
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::negotiated()
    }
}

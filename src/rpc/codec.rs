//! Content codecs and `Accept`-header negotiation.
//!
//! A codec turns a JSON-shaped value into bytes of one format. Codecs are
//! looked up by their *subtype* name — `json` for `application/json`,
//! `yaml` for `application/yaml`. A [`Codecs`] registry is a plain value:
//! build one, register your own codecs, hand it to a
//! [`Responder`](crate::bridge::Responder).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::request::Request;

/// Errors raised while encoding or decoding a body.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{codec}: {message}")]
    Unsupported { codec: &'static str, message: String },
}

/// One wire format.
pub trait Codec: Send + Sync + 'static {
    /// Subtype name, e.g. `json`.
    fn name(&self) -> &'static str;

    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError>;
}

/// `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str { "json" }

    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// `application/yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str { "yaml" }

    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_yaml::to_string(value)?.into_bytes())
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_yaml::from_slice(data)?)
    }
}

/// Serializes `value` and encodes it with `codec`.
pub fn marshal<T: Serialize + ?Sized>(codec: &dyn Codec, value: &T) -> Result<Vec<u8>, CodecError> {
    codec.marshal(&serde_json::to_value(value)?)
}

/// Registry of codecs keyed by subtype name.
#[derive(Clone)]
pub struct Codecs {
    by_name: HashMap<&'static str, Arc<dyn Codec>>,
}

impl Codecs {
    /// A registry with nothing in it. Negotiation still falls back to JSON.
    pub fn empty() -> Self {
        Self { by_name: HashMap::new() }
    }

    /// Adds `codec`, replacing any codec registered under the same name.
    pub fn register(mut self, codec: impl Codec) -> Self {
        self.by_name.insert(codec.name(), Arc::new(codec));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.by_name.get(name).cloned()
    }

    /// Picks the codec for the answer to `req`.
    ///
    /// Every value of `header` is split on commas; the first media range
    /// whose subtype names a registered codec wins. Otherwise JSON.
    pub fn for_request(&self, req: &Request, header: &str) -> Arc<dyn Codec> {
        req.header_values(header)
            .flat_map(|value| value.split(','))
            .find_map(|range| self.get(content_subtype(range.trim())))
            .unwrap_or_else(|| self.get("json").unwrap_or_else(|| Arc::new(JsonCodec)))
    }
}

impl Default for Codecs {
    /// JSON and YAML.
    fn default() -> Self {
        Self::empty().register(JsonCodec).register(YamlCodec)
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("Codecs").field("names", &names).finish()
    }
}

/// The part of a media type between `/` and the first `;`.
///
/// `application/json; charset=utf-8` gives `json`. Input without a `/`, or
/// with a `;` before it, gives the empty string.
pub fn content_subtype(content_type: &str) -> &str {
    let Some(left) = content_type.find('/') else {
        return "";
    };
    let right = content_type.find(';').unwrap_or(content_type.len());
    if right < left {
        return "";
    }
    content_type[left + 1..right].trim()
}

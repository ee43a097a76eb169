//! Bridge configuration.
//!
//! Deserializable so hosts can keep it next to their own settings:
//!
//! ```yaml
//! policy: fixed_json
//! accept_header: accept
//! ```

use serde::{Deserialize, Serialize};

/// How errors are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    /// Codec picked from the request's accept header; status from the error.
    #[default]
    Negotiated,
    /// Always JSON, always `500`.
    FixedJson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub policy: EncodingPolicy,
    /// Request header consulted for negotiation.
    pub accept_header: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            policy: EncodingPolicy::Negotiated,
            accept_header: "accept".to_owned(),
        }
    }
}

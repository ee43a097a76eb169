//! Protocol messages and their canonical JSON form.
//!
//! A [`Message`] describes itself as a flat list of [`Field`]s. The
//! [`MarshalOptions`] marshaler follows the protobuf JSON mapping:
//!
//! | field kind          | JSON                                   |
//! |---------------------|----------------------------------------|
//! | `bool`, 32-bit ints | literal                                |
//! | 64-bit ints         | decimal string                         |
//! | floats              | number, or `"NaN"` / `"Infinity"`      |
//! | bytes               | standard base64 string                 |
//! | enum                | value name (number if unnamed)         |
//! | message             | object, `null` when unset              |
//! | repeated / map      | array / object                         |
//!
//! Field keys are lowerCamelCase unless `use_proto_names` is set. Fields
//! holding their default value are left out unless `emit_unpopulated` is
//! set.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Number, Value as Json};

/// A structured protocol message.
pub trait Message: Send + Sync {
    /// Fully qualified type name, e.g. `google.protobuf.Empty`.
    fn full_name(&self) -> &'static str;

    /// The message's fields in declaration order.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// One field of a [`Message`].
pub struct Field<'a> {
    pub name: &'static str,
    /// Overrides the derived lowerCamelCase key.
    pub json_name: Option<&'static str>,
    pub value: Value<'a>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, value: Value<'a>) -> Self {
        Self { name, json_name: None, value }
    }

    pub fn json_name(mut self, json_name: &'static str) -> Self {
        self.json_name = Some(json_name);
        self
    }
}

/// A field value, borrowed from the message.
pub enum Value<'a> {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    Enum { number: i32, name: Option<&'static str> },
    Message(Option<&'a dyn Message>),
    List(Vec<Value<'a>>),
    Map(Vec<(String, Value<'a>)>),
}

impl Value<'_> {
    /// Whether the value differs from its type's default.
    fn is_populated(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int32(n) => *n != 0,
            Self::Int64(n) => *n != 0,
            Self::UInt32(n) => *n != 0,
            Self::UInt64(n) => *n != 0,
            Self::Float(f) => *f != 0.0 || f.is_sign_negative(),
            Self::Double(f) => *f != 0.0 || f.is_sign_negative(),
            Self::String(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::Enum { number, .. } => *number != 0,
            Self::Message(m) => m.is_some(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
        }
    }
}

/// `google.protobuf.Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl Message for Empty {
    fn full_name(&self) -> &'static str { "google.protobuf.Empty" }
    fn fields(&self) -> Vec<Field<'_>> { Vec::new() }
}

/// Errors raised by [`MarshalOptions::marshal`].
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("{message}: duplicate JSON field `{field}`")]
    DuplicateField { message: &'static str, field: String },
    #[error("{message}: duplicate map key `{key}`")]
    DuplicateKey { message: &'static str, key: String },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Marshaler settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Emit fields that hold their default value.
    pub emit_unpopulated: bool,
    /// Key fields by their declared name instead of lowerCamelCase.
    pub use_proto_names: bool,
    /// Write enums as numbers.
    pub use_enum_numbers: bool,
}

impl MarshalOptions {
    pub fn marshal(&self, message: &dyn Message) -> Result<Vec<u8>, MarshalError> {
        Ok(serde_json::to_vec(&self.to_json(message)?)?)
    }

    /// The message as a JSON value.
    pub fn to_json(&self, message: &dyn Message) -> Result<Json, MarshalError> {
        let mut object = Map::new();
        for field in message.fields() {
            if !self.emit_unpopulated && !field.value.is_populated() {
                continue;
            }
            let key = match (self.use_proto_names, field.json_name) {
                (true, _) => field.name.to_owned(),
                (false, Some(json_name)) => json_name.to_owned(),
                (false, None) => lower_camel(field.name),
            };
            if object.contains_key(&key) {
                return Err(MarshalError::DuplicateField { message: message.full_name(), field: key });
            }
            let value = self.value(message, &field.value)?;
            object.insert(key, value);
        }
        Ok(Json::Object(object))
    }

    fn value(&self, parent: &dyn Message, value: &Value<'_>) -> Result<Json, MarshalError> {
        Ok(match value {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int32(n) => Json::from(*n),
            Value::UInt32(n) => Json::from(*n),
            Value::Int64(n) => Json::String(n.to_string()),
            Value::UInt64(n) => Json::String(n.to_string()),
            // Shortest f32 decimal, so 0.1f32 stays 0.1 instead of 0.10000000149011612.
            Value::Float(f) => float(f.to_string().parse().unwrap_or(f64::from(*f))),
            Value::Double(f) => float(*f),
            Value::String(s) => Json::String((*s).to_owned()),
            Value::Bytes(b) => Json::String(STANDARD.encode(b)),
            Value::Enum { number, name } => match (self.use_enum_numbers, name) {
                (false, Some(name)) => Json::String((*name).to_owned()),
                _ => Json::from(*number),
            },
            Value::Message(None) => Json::Null,
            Value::Message(Some(message)) => self.to_json(*message)?,
            Value::List(items) => Json::Array(
                items.iter()
                    .map(|item| self.value(parent, item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => {
                let mut object = Map::new();
                for (key, entry) in entries {
                    if object.contains_key(key) {
                        return Err(MarshalError::DuplicateKey {
                            message: parent.full_name(),
                            key: key.clone(),
                        });
                    }
                    object.insert(key.clone(), self.value(parent, entry)?);
                }
                Json::Object(object)
            }
        })
    }
}

fn float(f: f64) -> Json {
    if f.is_nan() {
        Json::String("NaN".to_owned())
    } else if f.is_infinite() {
        Json::String(if f > 0.0 { "Infinity" } else { "-Infinity" }.to_owned())
    } else {
        Number::from_f64(f).map_or(Json::Null, Json::Number)
    }
}

/// `snake_case_name` to `snakeCaseName`, the way protoc derives JSON names.
fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

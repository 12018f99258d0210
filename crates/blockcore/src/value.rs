use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Dynamic value type for block properties, inputs and outputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    File(PathBuf),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, and numbers without a fractional part that fit in an `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            Value::Number(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::File(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::File(_) => "file",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Convert untagged JSON (designer payloads, CLI input) into a `Value`.
    ///
    /// Returns `None` when a number anywhere in the tree has no finite
    /// `f64` form, since it could not be written back out as JSON.
    pub fn from_plain_json(json: serde_json::Value) -> Option<Value> {
        let value = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Number(n.as_f64().filter(|f| f.is_finite())?),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(
                arr.into_iter()
                    .map(Value::from_plain_json)
                    .collect::<Option<_>>()?,
            ),
            serde_json::Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(k, v)| Value::from_plain_json(v).map(|v| (k, v)))
                    .collect::<Option<_>>()?,
            ),
        };
        Some(value)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::File(p)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

/// Declared type of a property or port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Bool,
    File,
    Json,
    Any,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Bool => "bool",
            ValueType::File => "file",
            ValueType::Json => "json",
            ValueType::Any => "any",
        }
    }

    /// Coerce a raw description value into this type.
    ///
    /// Strings are parsed, native JSON scalars of the matching kind pass
    /// through, and file names are resolved against `data_root`. The error
    /// carries a short description of what was actually supplied.
    pub fn coerce(&self, raw: &serde_json::Value, data_root: &Path) -> Result<Value, String> {
        use serde_json::Value as Json;

        let mismatch = || Err(describe(raw));

        match (self, raw) {
            (ValueType::Any, _) => Value::from_plain_json(raw.clone()).map_or_else(mismatch, Ok),
            (ValueType::Json, Json::String(s)) => Ok(Value::Json(
                serde_json::from_str(s).unwrap_or_else(|_| raw.clone()),
            )),
            (ValueType::Json, _) => Ok(Value::Json(raw.clone())),

            (ValueType::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (ValueType::String, Json::Number(n)) => Ok(Value::String(n.to_string())),
            (ValueType::String, Json::Bool(b)) => Ok(Value::String(b.to_string())),

            (ValueType::Integer, Json::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => mismatch(),
            },
            (ValueType::Integer, Json::String(s)) => {
                s.trim().parse::<i64>().map(Value::Integer).or_else(|_| mismatch())
            }

            (ValueType::Number, Json::Number(n)) => match n.as_f64() {
                Some(f) if f.is_finite() => Ok(Value::Number(f)),
                _ => mismatch(),
            },
            // "NaN" and "inf" parse as f64 but have no JSON form
            (ValueType::Number, Json::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Number(f)),
                _ => mismatch(),
            },

            (ValueType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (ValueType::Bool, Json::String(s)) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => mismatch(),
            },

            (ValueType::File, Json::String(s)) if !s.is_empty() => {
                Ok(Value::File(data_root.join(s)))
            }

            _ => mismatch(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn describe(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => format!("string {:?}", s),
        serde_json::Value::Number(n) => format!("number {}", n),
        serde_json::Value::Bool(b) => format!("bool {}", b),
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Array(_) => "array".to_string(),
        serde_json::Value::Object(_) => "object".to_string(),
    }
}

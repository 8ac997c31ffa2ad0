//! Parameter adaptation from wire shapes to typed argument structs.
//!
//! JSON-RPC parameters arrive either as a keyed mapping or a positional
//! sequence. [`Params`] keeps that distinction explicit as a tagged
//! variant; [`Params::bind`] adapts either shape into an operation's typed
//! argument struct against its declared parameter-name list, rejecting
//! anything that does not fit instead of coercing.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{BridgeError, Result};

/// Wire-shape of one request's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// `params` was a JSON object: bind by name.
    ByName(Map<String, Value>),
    /// `params` was a JSON array: bind by position.
    ByPosition(Vec<Value>),
    /// `params` was absent or `null`.
    Absent,
}

impl Params {
    /// Classify the raw `params` member of a request frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Params`] for scalar `params` values, which
    /// the protocol does not allow.
    pub fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::Absent),
            Some(Value::Object(map)) => Ok(Self::ByName(map)),
            Some(Value::Array(seq)) => Ok(Self::ByPosition(seq)),
            Some(other) => Err(BridgeError::Params(format!(
                "params must be an object or an array, got {other}"
            ))),
        }
    }

    /// Bind these parameters to `T` against the operation's declared
    /// parameter names.
    ///
    /// Positional parameters are matched to `names` left to right; keyed
    /// parameters must use declared names only. Count or type mismatches
    /// are reported, never coerced.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Params`] on undeclared keys, surplus
    /// positional values, or any type/requiredness mismatch surfaced by
    /// deserialization.
    pub fn bind<T: DeserializeOwned>(self, names: &[&str]) -> Result<T> {
        let map = match self {
            Self::Absent => Map::new(),
            Self::ByName(map) => {
                if let Some(unknown) = map.keys().find(|key| !names.contains(&key.as_str())) {
                    return Err(BridgeError::Params(format!(
                        "unexpected parameter '{unknown}'; declared parameters are [{}]",
                        names.join(", ")
                    )));
                }
                map
            }
            Self::ByPosition(seq) => {
                if seq.len() > names.len() {
                    return Err(BridgeError::Params(format!(
                        "too many positional parameters: expected at most {}, got {}",
                        names.len(),
                        seq.len()
                    )));
                }
                names
                    .iter()
                    .zip(seq)
                    .map(|(name, value)| ((*name).to_owned(), value))
                    .collect()
            }
        };

        serde_json::from_value(Value::Object(map))
            .map_err(|err| BridgeError::Params(err.to_string()))
    }

    /// Require that no parameters were supplied.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Params`] when any value is present.
    pub fn expect_empty(self) -> Result<()> {
        match self {
            Self::Absent => Ok(()),
            Self::ByName(map) if map.is_empty() => Ok(()),
            Self::ByPosition(seq) if seq.is_empty() => Ok(()),
            Self::ByName(_) | Self::ByPosition(_) => Err(BridgeError::Params(
                "operation takes no parameters".into(),
            )),
        }
    }
}

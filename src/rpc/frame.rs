//! JSON-RPC 2.0 frame types and constructors.
//!
//! One frame is one JSON object on one line, both directions. Inbound
//! frames are requests (or, without a correlation id, fire-and-forget
//! notifications); outbound frames are responses plus the unsolicited
//! `ready` / `notification` / `stream` notifications.

use serde::Deserialize;
use serde_json::{json, Value};

/// Protocol version tag required on every frame.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Reserved error code: malformed JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Reserved error code: structurally invalid request.
pub const INVALID_REQUEST: i64 = -32600;
/// Reserved error code: unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Reserved error code: parameter shape mismatch.
pub const INVALID_PARAMS: i64 = -32602;
/// Reserved error code: internal error; `data` carries a diagnostic.
pub const INTERNAL_ERROR: i64 = -32603;

/// Decoded inbound frame.
///
/// Every field is optional at the parse stage so one lenient pass can
/// classify the frame; structural validation happens in the dispatcher.
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Protocol version tag; must equal [`PROTOCOL_VERSION`].
    pub jsonrpc: Option<String>,
    /// Method name to route.
    pub method: Option<String>,
    /// Parameters, keyed or positional.
    #[serde(default)]
    pub params: Option<Value>,
    /// Correlation id; absent or `null` marks a notification.
    #[serde(default)]
    pub id: Option<Value>,
}

impl Request {
    /// The correlation id, if this frame expects a response.
    ///
    /// `id: null` and a missing `id` both mean "notification": the call is
    /// still invoked, but no response frame may be produced.
    #[must_use]
    pub fn correlation_id(&self) -> Option<Value> {
        self.id.clone().filter(|id| !id.is_null())
    }
}

/// Success response frame echoing the inbound id.
#[must_use]
pub fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": PROTOCOL_VERSION, "result": result, "id": id })
}

/// Error response frame.
///
/// `id` is the echoed inbound id, or `Value::Null` when no id could be
/// recovered (parse errors).
#[must_use]
pub fn error(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Value {
    let mut err = json!({ "code": code, "message": message.into() });
    if let Some(data) = data {
        err["data"] = data;
    }
    json!({ "jsonrpc": PROTOCOL_VERSION, "error": err, "id": id })
}

/// Unsolicited server-to-host frame (no id, never answered).
#[must_use]
pub fn notification(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": PROTOCOL_VERSION, "method": method, "params": params })
}

/// Best-effort extraction of an id from a raw frame value, for error
/// responses to structurally invalid requests.
#[must_use]
pub fn recover_id(value: &Value) -> Value {
    value.get("id").cloned().unwrap_or(Value::Null)
}

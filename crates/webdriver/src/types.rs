use serde_json::{json, Value};

use crate::error::WebDriverError;

/// Key under which W3C drivers return element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

// ─── ElementRef ───────────────────────────────────────────────────────────

/// Opaque handle to an element within one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub(crate) String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Parse `{"element-6066-…": "<id>"}`, accepting the legacy `ELEMENT` key.
    pub fn from_value(value: &Value) -> Result<Self, WebDriverError> {
        value
            .get(ELEMENT_KEY)
            .or_else(|| value.get("ELEMENT"))
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| WebDriverError::Decode(format!("not an element reference: {value}")))
    }
}

// ─── ChromeOptions ────────────────────────────────────────────────────────

/// Options for a new Chrome/Chromium session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromeOptions {
    /// Browser executable; `None` lets the driver locate one.
    pub binary: Option<String>,
    pub args: Vec<String>,
}

impl ChromeOptions {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Body for `POST /session`.
    pub fn to_new_session_body(&self) -> Value {
        let mut chrome = json!({ "args": self.args });
        if let Some(binary) = &self.binary {
            chrome["binary"] = Value::String(binary.clone());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome,
                }
            }
        })
    }
}

/// Turn a driver response body into its `value`, or the error it carries.
pub(crate) fn unwrap_response(ok: bool, mut body: Value) -> Result<Value, WebDriverError> {
    let Some(value) = body.get_mut("value").map(Value::take) else {
        return Err(WebDriverError::Decode(format!(
            "response has no value: {body}"
        )));
    };
    if ok {
        return Ok(value);
    }
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Err(WebDriverError::Protocol { error, message })
}

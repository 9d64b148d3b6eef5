use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CreateError;

/// Wire types spoken with the RemNote companion over the local WebSocket.
///
/// The protocol is one request frame and one reply frame per connection,
/// both JSON text frames. The reply carries an explicit `success` indicator;
/// everything else in a successful reply is surfaced verbatim to the caller.
pub const CREATE_REM_ACTION: &str = "createRem";

/// Fallback used when the companion reports failure without saying why.
pub const MISSING_ERROR_MESSAGE: &str = "remote reported failure without an error message";

/// Request frame (client → companion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRemRequest {
    pub action: String,
    pub text: String,
    /// `null` on the wire when the Rem has no parent.
    pub parent_id: Option<String>,
}

impl CreateRemRequest {
    /// Build a request with the fixed action tag. An empty parent id is
    /// normalized to the absent-parent marker.
    pub fn new(text: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            action: CREATE_REM_ACTION.to_owned(),
            text: text.into(),
            parent_id: parent_id
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
        }
    }
}

/// Classification of one inbound reply frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `success: true`; carries the full payload verbatim.
    Success(Value),
    /// `success` false or absent; carries the companion's error message.
    Failure(String),
}

impl Reply {
    /// Classify one text frame. A frame that is not JSON is a protocol
    /// error; a well-formed frame is judged solely on its `success` field.
    pub fn classify(frame: &str) -> Result<Reply, CreateError> {
        let payload: Value = serde_json::from_str(frame)
            .map_err(|e| CreateError::Protocol(format!("unparseable reply: {}", e)))?;

        if payload.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(Reply::Success(payload));
        }

        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or(MISSING_ERROR_MESSAGE)
            .to_owned();
        Ok(Reply::Failure(message))
    }
}

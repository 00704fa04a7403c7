use crate::error::ExtractionError;
use crate::record::Document;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Status code of a successful synchronous invocation.
pub const SUCCESS_STATUS: i32 = 200;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Raw result of one synchronous function invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub status_code: i32,
    /// Set when the function itself raised (the call still returns 200).
    pub function_error: Option<String>,
    pub payload: Vec<u8>,
}

/// A remote function that can be invoked synchronously with a JSON payload.
#[async_trait]
pub trait ExtractionFunction: Send + Sync {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<InvokeResponse, ExtractionError>;
}

/// Invokes the extraction function for staged files and decodes its answer.
pub struct ExtractionClient<F> {
    function: F,
    function_name: String,
}

impl<F: ExtractionFunction> ExtractionClient<F> {
    pub fn new<S: Into<String>>(function: F, function_name: S) -> Self {
        Self {
            function,
            function_name: function_name.into(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub async fn invoke(&self, file_name: &str) -> Result<Document, ExtractionError> {
        if file_name.is_empty() {
            return Err(ExtractionError::ClientError {
                code: "InvalidFileName".to_string(),
                message: "file name must not be empty".to_string(),
            });
        }

        let payload = json!({ "file_name": file_name }).to_string().into_bytes();
        log::debug!("invoking {} for {}", self.function_name, file_name);

        let response = self.function.invoke(&self.function_name, payload).await?;
        decode_response(&response)
    }
}

/// Interprets the invocation envelope.
///
/// The payload is a JSON object whose `body` field is itself JSON text
/// holding the document. A missing `body` yields an empty document.
pub fn decode_response(response: &InvokeResponse) -> Result<Document, ExtractionError> {
    if response.status_code != SUCCESS_STATUS {
        return Err(ExtractionError::RemoteFailure {
            message: format!(
                "status code {}: {}",
                response.status_code,
                error_message(&response.payload)
            ),
        });
    }

    if let Some(ref kind) = response.function_error {
        return Err(ExtractionError::RemoteFailure {
            message: format!("{}: {}", kind, error_message(&response.payload)),
        });
    }

    let envelope: Value = serde_json::from_slice(&response.payload).map_err(|e| ExtractionError::Decode {
        message: format!("payload is not JSON: {}", e),
    })?;

    let mut envelope = match envelope {
        Value::Object(map) => map,
        other => {
            return Err(ExtractionError::Decode {
                message: format!("payload must be a JSON object, got {}", kind_of(&other)),
            })
        }
    };

    match envelope.remove("body") {
        None | Some(Value::Null) => Ok(Document::new()),
        Some(Value::Object(document)) => Ok(document),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(other) => Err(ExtractionError::Decode {
                message: format!("body must decode to a JSON object, got {}", kind_of(&other)),
            }),
            Err(e) => Err(ExtractionError::Decode {
                message: format!("body is not JSON: {}", e),
            }),
        },
        Some(other) => Err(ExtractionError::Decode {
            message: format!("body must be JSON text, got {}", kind_of(&other)),
        }),
    }
}

fn error_message(payload: &[u8]) -> String {
    serde_json::from_slice::<Value>(payload)
        .ok()
        .and_then(|v| v.get("errorMessage").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

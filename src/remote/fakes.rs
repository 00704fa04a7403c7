//! In-memory collaborators for tests.

use crate::error::{ExtractionError, StageError};
use crate::remote::{ExtractionFunction, InvokeResponse, ObjectStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Object store that keeps uploads in memory and can be told to fail.
#[derive(Default)]
pub struct FakeStore {
    puts: Arc<Mutex<Vec<RecordedPut>>>,
    failures: Mutex<HashMap<String, usize>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `times` uploads of `key`.
    pub fn failing(self, key: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
        self
    }

    pub fn puts(&self) -> Arc<Mutex<Vec<RecordedPut>>> {
        self.puts.clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StageError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StageError::new("AccessDenied", format!("cannot write {}", key)));
                }
            }
        }

        self.puts.lock().unwrap().push(RecordedPut {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

type Scripted = Result<InvokeResponse, ExtractionError>;

/// Extraction function answering from a per-file script.
///
/// Each file has a queue of answers; the last one repeats.
#[derive(Default)]
pub struct FakeFunction {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    script: Mutex<HashMap<String, VecDeque<Scripted>>>,
}

impl FakeFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, file_name: &str, document: Value) -> Self {
        let payload = json!({"statusCode": 200, "body": document.to_string()});
        self.then(file_name, Ok(InvokeResponse {
            status_code: 200,
            function_error: None,
            payload: payload.to_string().into_bytes(),
        }))
    }

    pub fn with_error(self, file_name: &str, error: ExtractionError) -> Self {
        self.then(file_name, Err(error))
    }

    pub fn with_response(self, file_name: &str, response: InvokeResponse) -> Self {
        self.then(file_name, Ok(response))
    }

    fn then(self, file_name: &str, answer: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(file_name.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl ExtractionFunction for FakeFunction {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<InvokeResponse, ExtractionError> {
        let request: Value = serde_json::from_slice(&payload).unwrap();
        let file_name = request["file_name"].as_str().unwrap_or_default().to_string();
        self.calls
            .lock()
            .unwrap()
            .push((function_name.to_string(), request));

        let mut script = self.script.lock().unwrap();
        match script.get_mut(&file_name) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(InvokeResponse {
                status_code: 404,
                function_error: None,
                payload: json!({"errorMessage": format!("no such key {}", file_name)})
                    .to_string()
                    .into_bytes(),
            }),
        }
    }
}

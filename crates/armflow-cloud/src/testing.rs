//! In-memory transport for unit tests

use crate::error::Result;
use crate::provider::{Method, Transport, TransportResponse};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Handler = dyn FnMut(Method, &str, Option<&serde_json::Value>) -> Result<TransportResponse>
    + Send;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Answers every request with a scripted handler and records what was sent
#[derive(Clone)]
pub struct MockTransport {
    handler: Arc<Mutex<Box<Handler>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(Method, &str, Option<&serde_json::Value>) -> Result<TransportResponse>
            + Send
            + 'static,
    {
        Self {
            handler: Arc::new(Mutex::new(Box::new(handler))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path_fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path.contains(path_fragment))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        let mut handler = self.handler.lock().unwrap();
        (*handler)(method, path, body)
    }
}

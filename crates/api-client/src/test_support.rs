//! In-memory transport for unit tests

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued outcomes in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: HttpResponse) {
        self.script.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, value: Value) {
        self.push(HttpResponse::json(status, &value));
    }

    pub fn push_status(&self, status: u16) {
        self.push(HttpResponse::bytes(status, format!("status {status}"), None));
    }

    pub fn push_timeout(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Timeout("scripted timeout".into())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

/// A page of `count` items with ids starting at `first_id`
pub fn page_of_ids(first_id: u64, count: u64, total_results: u64) -> Value {
    let results: Vec<Value> = (first_id..first_id + count)
        .map(|id| serde_json::json!({ "id": id }))
        .collect();
    serde_json::json!({ "total_results": total_results, "results": results })
}

// src/testing.rs
//! In-process backend and wire fixtures for unit tests.

use crate::api::{BackendFailure, HttpBackend, Transport, WireRequest, WireResponse};
use crate::error_recovery::RetryPolicy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

pub type Scripted = Result<WireResponse, BackendFailure>;

/// Answers requests from a fixed script and records what it was asked.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<WireRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<WireRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl HttpBackend for ScriptedBackend {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, BackendFailure> {
        self.calls.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .expect("backend called more often than scripted")
    }
}

pub fn transport(backend: Arc<ScriptedBackend>) -> Transport {
    Transport::new(backend).with_policy(RetryPolicy::immediate(3))
}

pub fn ok(body: Value) -> Scripted {
    Ok(WireResponse::json(200, &body))
}

pub fn error(status: u16, code: &str) -> Scripted {
    Ok(WireResponse::json(
        status,
        &json!({ "object": "error", "status": status, "code": code, "message": code }),
    ))
}

pub fn listing(results: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": results,
        "next_cursor": next_cursor,
        "has_more": next_cursor.is_some(),
    })
}

/// A task-shaped page with the default property names.
pub fn task_page(id: &str, title: &str, status: &str, owners: &[(&str, &str)]) -> Value {
    let people: Vec<Value> = owners
        .iter()
        .map(|(id, name)| json!({ "object": "user", "id": id, "name": name }))
        .collect();
    json!({
        "object": "page",
        "id": id,
        "last_edited_time": "2024-05-01T10:00:00.000Z",
        "parent": { "type": "database_id", "database_id": "d9824bdc-8445-4327-be8b-5b47500af6ce" },
        "properties": {
            "Title": {
                "type": "title",
                "title": [{ "type": "text", "plain_text": title, "text": { "content": title } }]
            },
            "Status": { "type": "status", "status": { "name": status } },
            "Owner": { "type": "people", "people": people },
        }
    })
}

pub fn paragraph(id: &str, text: &str, has_children: bool) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "has_children": has_children,
        "paragraph": {
            "rich_text": [{ "type": "text", "plain_text": text, "text": { "content": text } }]
        }
    })
}

// tests/common/mod.rs
//! Shared helpers: an in-memory backend that plays back scripted responses
//! and records every request it receives.

#![allow(dead_code)]

use notion_agent::{
    BackendFailure, DatabaseId, HttpBackend, RetryPolicy, Transport, WireRequest, WireResponse,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DATABASE: &str = "d9824bdc84454327be8b5b47500af6ce";

pub type Scripted = Result<WireResponse, BackendFailure>;

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

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.path.clone()).collect()
    }
}

#[async_trait::async_trait]
impl HttpBackend for ScriptedBackend {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, BackendFailure> {
        self.calls.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request: {} {}", request.method, request.path))
    }
}

pub fn transport(backend: Arc<ScriptedBackend>) -> Transport {
    Transport::new(backend).with_policy(RetryPolicy::immediate(3))
}

pub fn database() -> DatabaseId {
    DatabaseId::parse(DATABASE).expect("test database id is valid")
}

pub fn fixture(name: &str) -> Value {
    let path = format!(
        "{}/tests/fixtures/api_responses/{}",
        env!("CARGO_MANIFEST_DIR"),
        name
    );
    let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("{}: {}", path, e))
}

pub fn ok(body: Value) -> Scripted {
    Ok(WireResponse::json(200, &body))
}

pub fn status(code: u16, body: Value) -> Scripted {
    Ok(WireResponse::json(code, &body))
}

pub fn listing(results: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": results,
        "next_cursor": next_cursor,
        "has_more": next_cursor.is_some(),
    })
}

/// 32-hex block id derived from a short label, e.g. `block_id(12)`.
pub fn block_id(n: u32) -> String {
    format!("b{:031x}", n)
}

pub fn block(n: u32, kind: &str, text: &str, has_children: bool) -> Value {
    json!({
        "object": "block",
        "id": block_id(n),
        "type": kind,
        "has_children": has_children,
        kind: {
            "rich_text": [{ "type": "text", "plain_text": text, "text": { "content": text } }]
        }
    })
}

pub fn children_path(parent: &str) -> String {
    format!("blocks/{}/children?page_size=100", dashed(parent))
}

pub fn dashed(id: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

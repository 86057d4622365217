//! Test Helper Utilities
//!
//! Shared utilities for testing songstep-gen: a scripted in-memory
//! transport and state builders rooted in a temporary directory.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use songstep_gen::config::ServiceConfig;
use songstep_gen::error::{CoreError, CoreResult};
use songstep_gen::services::{TransportOutcome, UpstreamCall, UpstreamTransport};
use songstep_gen::AppState;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const MUSIC_KEY: &str = "music-key-0123456789";
pub const DASHSCOPE_KEY: &str = "sk-dashscope-0123456789";

/// Scripted transport
///
/// Responses are queued per URL fragment; the first fragment contained in
/// a call's URL answers it. The last queued response for a fragment is
/// repeated once the queue runs dry.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(String, VecDeque<TransportOutcome>)>>,
    downloads: Mutex<HashMap<String, CoreResult<Vec<u8>>>>,
    calls: Mutex<Vec<UpstreamCall>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, fragment: &str, outcome: TransportOutcome) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(f, _)| f == fragment) {
            Some((_, queue)) => queue.push_back(outcome),
            None => routes.push((fragment.to_string(), VecDeque::from([outcome]))),
        }
    }

    pub fn respond_json(&self, fragment: &str, body: Value) {
        self.respond(
            fragment,
            TransportOutcome::Completed {
                status: 200,
                body: body.to_string(),
            },
        );
    }

    pub fn serve_file(&self, url: &str, result: CoreResult<Vec<u8>>) {
        self.downloads.lock().unwrap().insert(url.to_string(), result);
    }

    pub fn calls(&self) -> Vec<UpstreamCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, fragment: &str) -> Vec<UpstreamCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url.contains(fragment))
            .collect()
    }
}

#[async_trait]
impl UpstreamTransport for FakeTransport {
    async fn execute(&self, call: UpstreamCall) -> TransportOutcome {
        self.calls.lock().unwrap().push(call.clone());
        let mut routes = self.routes.lock().unwrap();
        let Some((_, queue)) = routes.iter_mut().find(|(f, _)| call.url.contains(f.as_str())) else {
            return TransportOutcome::Failure(format!("connect: no route for {}", call.url));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }

    async fn download(&self, url: &str) -> CoreResult<Vec<u8>> {
        self.downloads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(CoreError::TransportFailure(format!("connect: {}", url))))
    }
}

/// Config with both credentials set, rooted at `root`
pub fn test_config(root: &std::path::Path, music_base_url: &str) -> ServiceConfig {
    let mut config = ServiceConfig::new(root);
    config.music_base_url = music_base_url.to_string();
    config.music_api_key = MUSIC_KEY.to_string();
    config.dashscope_api_key = DASHSCOPE_KEY.to_string();
    config.dashscope_base_url = "https://dashscope.test".to_string();
    config
}

/// App state over a fresh temp dir and a scripted transport
///
/// The TempDir must be kept alive for the duration of the test.
pub fn test_state(music_base_url: &str) -> (TempDir, Arc<FakeTransport>, AppState) {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let state = AppState::new(test_config(dir.path(), music_base_url), transport.clone()).unwrap();
    (dir, transport, state)
}

/// DashScope answer carrying plain text content
pub fn text_reply(content: &str) -> Value {
    json!({
        "request_id": "req-text",
        "output": { "choices": [ { "message": { "role": "assistant", "content": content } } ] }
    })
}

/// DashScope answer carrying one image URL
pub fn image_reply(url: &str) -> Value {
    json!({
        "request_id": "req-image",
        "output": {
            "choices": [ { "message": { "role": "assistant", "content": [ { "image": url } ] } } ]
        },
        "usage": { "image_count": 1 }
    })
}

/// A decomposition reply with the given step names
pub fn decomposition_reply(steps: &[&str]) -> String {
    let steps: Vec<Value> = steps
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "step_number": i + 1,
                "step_name": name,
                "step_description": format!("Do {}", name),
                "learning_objective": format!("Learn {}", name),
            })
        })
        .collect();
    let body = json!({
        "steps": steps,
        "character_name": "Lele",
        "character_description": "a curious boy",
        "character_sheet": { "reference_prompt": "boy, red cap, blue overalls" }
    });
    format!("```json\n{}\n```", body)
}

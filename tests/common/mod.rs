// tests/common/mod.rs
//! Test doubles for the listing API and the mail transport.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::Message;
use serde_json::Value;

use wanted_digest::ingest::types::{FetchError, ListingsApi, QueryParams};
use wanted_digest::notify::{DeliveryError, MailTransport, SmtpTarget};

/// Scripted reply for one request.
pub enum Reply {
    Body(Value),
    Unprocessable,
    Status(u16),
}

/// Serves scripted replies in order and records every parameter set it saw.
/// Once the script runs out it answers with an empty `data` envelope.
pub struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    pub calls: Mutex<Vec<QueryParams>>,
}

impl ScriptedApi {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn bodies(bodies: Vec<Value>) -> Self {
        Self::new(bodies.into_iter().map(Reply::Body).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn keys_of_call(&self, n: usize) -> Vec<&'static str> {
        self.calls.lock().unwrap()[n].iter().map(|(k, _)| *k).collect()
    }

    pub fn value_of(&self, n: usize, key: &str) -> Option<String> {
        self.calls.lock().unwrap()[n]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl ListingsApi for ScriptedApi {
    async fn get_page(&self, params: &QueryParams) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(params.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Body(v)) => Ok(v),
            Some(Reply::Unprocessable) => Err(FetchError::Unprocessable { status: 422 }),
            Some(Reply::Status(status)) => Err(FetchError::Status { status }),
            None => Ok(serde_json::json!({ "data": [] })),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Records sent messages; fails every send when `fail` is set.
#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<String>>,
}

impl RecordingMailer {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, _target: &SmtpTarget, message: Message) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("connection refused".into()));
        }
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        self.sent.lock().unwrap().push(raw);
        Ok(())
    }
}

pub fn listing(id: &str, title: &str) -> Value {
    serde_json::json!({ "id": id, "title": title })
}

/// Page of `n` listings with ids `start..start+n`.
pub fn page(start: usize, n: usize) -> Value {
    let data: Vec<Value> = (start..start + n)
        .map(|i| serde_json::json!({ "id": i, "position": format!("Job {i}") }))
        .collect();
    serde_json::json!({ "data": data })
}

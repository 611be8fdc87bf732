use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;

use crate::transport::{ApiTransport, HttpReply};

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct RecordingTransport {
    replies: Mutex<VecDeque<anyhow::Result<HttpReply>>>,
    requests: Mutex<Vec<Request>>,
}

impl RecordingTransport {
    pub fn new(replies: Vec<anyhow::Result<HttpReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn next_reply(&self, request: Request) -> anyhow::Result<HttpReply> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("missing scripted reply")))
    }
}

impl ApiTransport for RecordingTransport {
    fn get(&self, url: &str, _timeout: Duration) -> anyhow::Result<HttpReply> {
        self.next_reply(Request {
            method: "GET",
            url: url.to_string(),
            body: None,
        })
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        _timeout: Duration,
    ) -> anyhow::Result<HttpReply> {
        self.next_reply(Request {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
        })
    }
}

pub fn reply(status: u16, body: &str) -> anyhow::Result<HttpReply> {
    Ok(HttpReply {
        status,
        body: body.to_string(),
    })
}

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use upsell_app::transport::{ApiTransport, HttpReply};
use upsell_core::account::Account;
use upsell_core::checkout::{CheckoutEvent, CheckoutWidget};

pub static ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct QueueTransport {
    replies: Mutex<VecDeque<anyhow::Result<HttpReply>>>,
    calls: Mutex<Vec<Call>>,
}

impl QueueTransport {
    pub fn new(replies: Vec<anyhow::Result<HttpReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn pop(&self, call: Call) -> anyhow::Result<HttpReply> {
        self.calls.lock().expect("calls lock").push(call);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("missing scripted reply")))
    }
}

impl ApiTransport for QueueTransport {
    fn get(&self, url: &str, _timeout: Duration) -> anyhow::Result<HttpReply> {
        self.pop(Call {
            method: "GET".to_string(),
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
        self.pop(Call {
            method: "POST".to_string(),
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

#[derive(Default)]
pub struct QueueCheckout {
    sender: Mutex<Option<Sender<CheckoutEvent>>>,
}

impl QueueCheckout {
    pub fn emit(&self, event: CheckoutEvent) {
        let guard = self.sender.lock().expect("checkout lock");
        let sender = guard.as_ref().expect("checkout open");
        sender.send(event).expect("checkout event");
    }
}

impl CheckoutWidget for QueueCheckout {
    fn open(&self, _user: &Account, _enterprise: bool) -> Receiver<CheckoutEvent> {
        let (sender, receiver) = mpsc::channel();
        *self.sender.lock().expect("checkout lock") = Some(sender);
        receiver
    }
}

pub const VALID_CONFIG: &str = r#"
version = 1

[api]
base_url = "https://api.kactus.io"

[account]
login = "octocat"
email = "octocat@example.com"
"#;

pub fn write_config(home: &Path, raw: &str) {
    let config_dir = home.join(".config").join("kactus-upsell");
    fs::create_dir_all(&config_dir).expect("create config dir");
    fs::write(config_dir.join("config.toml"), raw).expect("write config");
}

/// Polls `step` until it reports done; worker threads answer asynchronously.
pub fn wait_until(mut step: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !step() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

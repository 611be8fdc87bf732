use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait ApiTransport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<HttpReply>;

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> anyhow::Result<HttpReply>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("kactus-upsell/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl ApiTransport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> anyhow::Result<HttpReply> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        reply_from(response)
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> anyhow::Result<HttpReply> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        reply_from(response)
    }
}

fn reply_from(response: reqwest::blocking::Response) -> anyhow::Result<HttpReply> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .context("failed to read response body")?;
    Ok(HttpReply { status, body })
}

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use upsell_core::account::Account;
use upsell_core::coupon::{
    CouponLookup, CouponLookupError, CouponRecord, CouponResponse, RequestToken, normalize_lookup,
};
use upsell_core::dispatch::{UnlockDispatcher, UnlockMetadata};

use crate::host::UnlockEvent;
use crate::transport::ApiTransport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponBody {
    request_id: RequestToken,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    discount: Option<u32>,
}

#[derive(Clone)]
pub struct HttpCouponLookup {
    transport: Arc<dyn ApiTransport>,
    base_url: String,
    timeout: Duration,
}

impl HttpCouponLookup {
    pub fn new(transport: Arc<dyn ApiTransport>, base_url: &str, timeout: Duration) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn coupon_url(&self, code: &str, token: RequestToken) -> Result<Url, CouponLookupError> {
        let mut url = Url::parse(&format!("{}/coupons", self.base_url)).map_err(|error| {
            CouponLookupError::Transport {
                message: format!("invalid api base url '{}': {error}", self.base_url),
            }
        })?;
        url.path_segments_mut()
            .map_err(|()| CouponLookupError::Transport {
                message: format!("api base url '{}' cannot take a path", self.base_url),
            })?
            .push(code);
        url.query_pairs_mut()
            .append_pair("requestId", &token.value().to_string());
        Ok(url)
    }

    /// One blocking round-trip. The token in the answer is whatever the
    /// service echoed back.
    pub fn fetch(
        &self,
        code: &str,
        token: RequestToken,
    ) -> Result<CouponResponse, CouponLookupError> {
        let url = self.coupon_url(code, token)?;
        let reply = self
            .transport
            .get(url.as_str(), self.timeout)
            .map_err(|error| CouponLookupError::Transport {
                message: format!("{error:#}"),
            })?;

        if reply.status == 404 {
            return Err(CouponLookupError::NotFound {
                code: code.to_string(),
            });
        }
        if !reply.is_success() {
            return Err(CouponLookupError::Transport {
                message: format!("coupon service answered with status {}", reply.status),
            });
        }

        let body: CouponBody =
            serde_json::from_str(&reply.body).map_err(|error| CouponLookupError::Malformed {
                message: error.to_string(),
            })?;

        Ok(CouponResponse::new(
            body.request_id,
            CouponRecord {
                code: body.code.or_else(|| Some(code.to_string())),
                discount: body.discount,
            },
        ))
    }
}

impl CouponLookup for HttpCouponLookup {
    fn lookup(&self, code: String, token: RequestToken) -> Receiver<CouponResponse> {
        let (sender, receiver) = mpsc::channel();
        let lookup = self.clone();
        std::thread::spawn(move || {
            let response = normalize_lookup(token, lookup.fetch(&code, token));
            let _ = sender.send(response);
        });
        receiver
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlockRequest<'a> {
    login: &'a str,
    payment_token_id: &'a str,
    #[serde(flatten)]
    metadata: &'a UnlockMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnlockBody {
    #[serde(default)]
    unlocked_kactus: bool,
}

#[derive(Clone)]
pub struct HttpUnlockDispatcher {
    transport: Arc<dyn ApiTransport>,
    base_url: String,
    timeout: Duration,
    events: Sender<UnlockEvent>,
}

impl HttpUnlockDispatcher {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        base_url: &str,
        timeout: Duration,
        events: Sender<UnlockEvent>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            events,
        }
    }

    /// Blocking unlock call. `true` only when the service confirms the
    /// entitlement.
    pub fn send_unlock(
        &self,
        user: &Account,
        payment_token_id: &str,
        metadata: &UnlockMetadata,
    ) -> anyhow::Result<bool> {
        let request = UnlockRequest {
            login: &user.login,
            payment_token_id,
            metadata,
        };
        let body = serde_json::to_value(&request)?;
        let url = format!("{}/unlock", self.base_url);
        let reply = self.transport.post_json(&url, &body, self.timeout)?;

        if !reply.is_success() {
            anyhow::bail!("unlock service answered with status {}", reply.status);
        }

        let parsed: UnlockBody = if reply.body.trim().is_empty() {
            UnlockBody::default()
        } else {
            serde_json::from_str(&reply.body)?
        };
        Ok(parsed.unlocked_kactus)
    }
}

impl UnlockDispatcher for HttpUnlockDispatcher {
    fn unlock(&self, user: &Account, payment_token_id: &str, metadata: UnlockMetadata) {
        let _ = self.events.send(UnlockEvent::Started);

        let dispatcher = self.clone();
        let user = user.clone();
        let payment_token_id = payment_token_id.to_string();
        std::thread::spawn(move || {
            let entitled = match dispatcher.send_unlock(&user, &payment_token_id, &metadata) {
                Ok(entitled) => entitled,
                Err(error) => {
                    tracing::warn!(login = %user.login, error = %format!("{error:#}"), "unlock failed");
                    false
                }
            };
            let _ = dispatcher.events.send(UnlockEvent::Finished { entitled });
        });
    }
}

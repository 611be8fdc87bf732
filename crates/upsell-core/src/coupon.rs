use std::fmt;
use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tags one dispatched validation call and its response.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl RequestToken {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CouponRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
}

impl CouponRecord {
    pub fn no_discount() -> Self {
        Self::default()
    }

    pub fn with_discount(code: impl Into<String>, discount: u32) -> Self {
        Self {
            code: Some(code.into()),
            discount: Some(discount),
        }
    }

    /// A zero discount is as good as none.
    pub fn has_discount(&self) -> bool {
        matches!(self.discount, Some(discount) if discount > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponResponse {
    pub token: RequestToken,
    pub record: CouponRecord,
}

impl CouponResponse {
    pub fn new(token: RequestToken, record: CouponRecord) -> Self {
        Self { token, record }
    }

    pub fn invalid(token: RequestToken) -> Self {
        Self::new(token, CouponRecord::no_discount())
    }
}

#[derive(Debug, Error)]
pub enum CouponLookupError {
    #[error("coupon '{code}' was not found")]
    NotFound { code: String },
    #[error("coupon lookup request failed: {message}")]
    Transport { message: String },
    #[error("coupon lookup returned an unreadable body: {message}")]
    Malformed { message: String },
}

/// Folds every lookup failure into a resolved "no discount" answer for the
/// same token so the caller always leaves the pending state.
pub fn normalize_lookup(
    token: RequestToken,
    result: Result<CouponResponse, CouponLookupError>,
) -> CouponResponse {
    match result {
        Ok(response) => response,
        Err(CouponLookupError::NotFound { code }) => {
            tracing::debug!(%token, code = %code, "coupon not found");
            CouponResponse::invalid(token)
        }
        Err(error) => {
            tracing::warn!(%token, error = %error, "coupon lookup failed");
            CouponResponse::invalid(token)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CouponValidation {
    #[default]
    Unknown,
    Pending,
    Resolved(CouponRecord),
}

impl CouponValidation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn resolved(&self) -> Option<&CouponRecord> {
        match self {
            Self::Resolved(record) => Some(record),
            Self::Unknown | Self::Pending => None,
        }
    }
}

pub trait CouponLookup: Send + Sync {
    /// Starts one lookup. The receiver yields a single response echoing
    /// `token`; a receiver that hangs up without answering counts as an
    /// invalid coupon.
    fn lookup(&self, code: String, token: RequestToken) -> Receiver<CouponResponse>;
}

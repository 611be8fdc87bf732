use serde::Serialize;

use crate::account::Account;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockMetadata {
    pub email: String,
    pub enterprise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
}

impl UnlockMetadata {
    /// An empty coupon field means no coupon, never `Some("")`.
    pub fn new(email: impl Into<String>, enterprise: bool, coupon: &str) -> Self {
        Self {
            email: email.into(),
            enterprise,
            coupon: (!coupon.is_empty()).then(|| coupon.to_string()),
        }
    }
}

pub trait UnlockDispatcher: Send + Sync {
    /// Fire-and-forget. The outcome only shows up in the host flags.
    fn unlock(&self, user: &Account, payment_token_id: &str, metadata: UnlockMetadata);
}

#[cfg(test)]
mod tests {
    use super::UnlockMetadata;

    #[test]
    fn empty_coupon_is_omitted() {
        let metadata = UnlockMetadata::new("a@b.com", false, "");
        assert_eq!(metadata.coupon, None);

        let metadata = UnlockMetadata::new("a@b.com", true, "SAVE10");
        assert_eq!(metadata.coupon.as_deref(), Some("SAVE10"));
        assert!(metadata.enterprise);
    }
}

use std::sync::mpsc::Receiver;

use crate::account::Account;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentToken {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    Loaded,
    Token(PaymentToken),
    Dismissed,
}

pub trait CheckoutWidget: Send + Sync {
    /// Mounts the widget. It reports `Loaded` once ready and `Token` once per
    /// successful payment.
    fn open(&self, user: &Account, enterprise: bool) -> Receiver<CheckoutEvent>;
}

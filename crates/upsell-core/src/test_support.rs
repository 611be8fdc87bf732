use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::account::Account;
use crate::checkout::{CheckoutEvent, CheckoutWidget};
use crate::coupon::{CouponLookup, CouponRecord, CouponResponse, RequestToken};
use crate::dispatch::{UnlockDispatcher, UnlockMetadata};

#[derive(Default)]
pub struct ScriptedLookup {
    calls: Mutex<Vec<(String, RequestToken)>>,
    senders: Mutex<Vec<(RequestToken, Sender<CouponResponse>)>>,
}

impl ScriptedLookup {
    pub fn calls(&self) -> Vec<(String, RequestToken)> {
        self.calls.lock().expect("lookup calls lock").clone()
    }

    pub fn respond(&self, token: RequestToken, record: CouponRecord) {
        self.respond_with(token, CouponResponse::new(token, record));
    }

    pub fn respond_with(&self, via: RequestToken, response: CouponResponse) {
        let senders = self.senders.lock().expect("lookup senders lock");
        let (_, sender) = senders
            .iter()
            .find(|(token, _)| *token == via)
            .expect("lookup sender for token");
        // The validator may already have dropped its receiver.
        let _ = sender.send(response);
    }

    pub fn hang_up(&self, token: RequestToken) {
        self.senders
            .lock()
            .expect("lookup senders lock")
            .retain(|(candidate, _)| *candidate != token);
    }
}

impl CouponLookup for ScriptedLookup {
    fn lookup(&self, code: String, token: RequestToken) -> Receiver<CouponResponse> {
        self.calls
            .lock()
            .expect("lookup calls lock")
            .push((code, token));
        let (sender, receiver) = mpsc::channel();
        self.senders
            .lock()
            .expect("lookup senders lock")
            .push((token, sender));
        receiver
    }
}

#[derive(Default)]
pub struct ScriptedCheckout {
    opened: Mutex<Vec<(String, bool)>>,
    sender: Mutex<Option<Sender<CheckoutEvent>>>,
}

impl ScriptedCheckout {
    pub fn opened(&self) -> Vec<(String, bool)> {
        self.opened.lock().expect("checkout opened lock").clone()
    }

    pub fn send(&self, event: CheckoutEvent) {
        self.sender
            .lock()
            .expect("checkout sender lock")
            .as_ref()
            .expect("checkout should be open")
            .send(event)
            .expect("send checkout event");
    }
}

impl CheckoutWidget for ScriptedCheckout {
    fn open(&self, user: &Account, enterprise: bool) -> Receiver<CheckoutEvent> {
        self.opened
            .lock()
            .expect("checkout opened lock")
            .push((user.login.clone(), enterprise));
        let (sender, receiver) = mpsc::channel();
        *self.sender.lock().expect("checkout sender lock") = Some(sender);
        receiver
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockCall {
    pub login: String,
    pub payment_token_id: String,
    pub metadata: UnlockMetadata,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<UnlockCall>>,
}

impl RecordingDispatcher {
    pub fn calls(&self) -> Vec<UnlockCall> {
        self.calls.lock().expect("dispatcher calls lock").clone()
    }
}

impl UnlockDispatcher for RecordingDispatcher {
    fn unlock(&self, user: &Account, payment_token_id: &str, metadata: UnlockMetadata) {
        self.calls
            .lock()
            .expect("dispatcher calls lock")
            .push(UnlockCall {
                login: user.login.clone(),
                payment_token_id: payment_token_id.to_string(),
                metadata,
            });
    }
}

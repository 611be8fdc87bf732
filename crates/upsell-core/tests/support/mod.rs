use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use upsell_core::account::Account;
use upsell_core::checkout::{CheckoutEvent, CheckoutWidget};
use upsell_core::clock::ManualClock;
use upsell_core::coupon::{CouponLookup, CouponRecord, CouponResponse, RequestToken};
use upsell_core::dispatch::{UnlockDispatcher, UnlockMetadata};
use upsell_core::flow::{Collaborators, FlowSettings, UpsellFlow};

#[derive(Default)]
pub struct QueueLookup {
    pending: Mutex<Vec<(String, RequestToken, Sender<CouponResponse>)>>,
}

impl QueueLookup {
    pub fn codes(&self) -> Vec<String> {
        self.pending
            .lock()
            .expect("lookup lock")
            .iter()
            .map(|(code, _, _)| code.clone())
            .collect()
    }

    pub fn answer(&self, code: &str, record: CouponRecord) {
        let pending = self.pending.lock().expect("lookup lock");
        let (_, token, sender) = pending
            .iter()
            .rev()
            .find(|(candidate, _, _)| candidate == code)
            .expect("lookup for code");
        let _ = sender.send(CouponResponse::new(*token, record));
    }
}

impl CouponLookup for QueueLookup {
    fn lookup(&self, code: String, token: RequestToken) -> Receiver<CouponResponse> {
        let (sender, receiver) = mpsc::channel();
        self.pending
            .lock()
            .expect("lookup lock")
            .push((code, token, sender));
        receiver
    }
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

#[derive(Default)]
pub struct CountingDispatcher {
    calls: Mutex<Vec<(String, String, UnlockMetadata)>>,
}

impl CountingDispatcher {
    pub fn calls(&self) -> Vec<(String, String, UnlockMetadata)> {
        self.calls.lock().expect("dispatcher lock").clone()
    }
}

impl UnlockDispatcher for CountingDispatcher {
    fn unlock(&self, user: &Account, payment_token_id: &str, metadata: UnlockMetadata) {
        self.calls.lock().expect("dispatcher lock").push((
            user.login.clone(),
            payment_token_id.to_string(),
            metadata,
        ));
    }
}

pub struct Dialog {
    pub clock: Arc<ManualClock>,
    pub lookup: Arc<QueueLookup>,
    pub checkout: Arc<QueueCheckout>,
    pub dispatcher: Arc<CountingDispatcher>,
    pub flow: UpsellFlow,
}

pub fn mount(user: Account) -> Dialog {
    let clock = Arc::new(ManualClock::new());
    let lookup = Arc::new(QueueLookup::default());
    let checkout = Arc::new(QueueCheckout::default());
    let dispatcher = Arc::new(CountingDispatcher::default());
    let flow = UpsellFlow::new(
        user,
        FlowSettings::default(),
        Collaborators {
            lookup: lookup.clone(),
            checkout: checkout.clone(),
            dispatcher: dispatcher.clone(),
            clock: clock.clone(),
        },
    );

    Dialog {
        clock,
        lookup,
        checkout,
        dispatcher,
        flow,
    }
}

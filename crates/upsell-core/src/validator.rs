use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crate::clock::{Clock, TimerHandle, TimerQueue};
use crate::coupon::{CouponLookup, CouponResponse, CouponValidation, RequestToken};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct InFlight {
    token: RequestToken,
    receiver: Receiver<CouponResponse>,
}

/// Turns a burst of coupon edits into at most one lookup and keeps only the
/// answer to the latest dispatched lookup.
pub struct DebouncedValidator {
    lookup: Arc<dyn CouponLookup>,
    timers: TimerQueue<String>,
    debounce: Duration,
    debounce_timer: Option<TimerHandle>,
    last_token: RequestToken,
    expected_token: Option<RequestToken>,
    in_flight: Vec<InFlight>,
    result: CouponValidation,
}

impl DebouncedValidator {
    pub fn new(lookup: Arc<dyn CouponLookup>, clock: Arc<dyn Clock>, debounce: Duration) -> Self {
        Self {
            lookup,
            timers: TimerQueue::new(clock),
            debounce,
            debounce_timer: None,
            last_token: RequestToken::default(),
            expected_token: None,
            in_flight: Vec::new(),
            result: CouponValidation::Unknown,
        }
    }

    pub fn result(&self) -> &CouponValidation {
        &self.result
    }

    pub fn expected_token(&self) -> Option<RequestToken> {
        self.expected_token
    }

    pub fn has_pending_timer(&self) -> bool {
        self.debounce_timer
            .is_some_and(|handle| self.timers.is_pending(handle))
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn on_code_changed(&mut self, code: &str) {
        self.cancel();
        // Anything already dispatched answers for an older code.
        self.expected_token = None;

        if code.is_empty() {
            self.in_flight.clear();
            self.result = CouponValidation::Unknown;
            return;
        }

        self.result = CouponValidation::Pending;
        self.debounce_timer = Some(self.timers.schedule(self.debounce, code.to_string()));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.debounce_timer.take() {
            self.timers.cancel(handle);
        }
    }

    /// Drops the timer and every outstanding expectation. Late answers end up
    /// nowhere.
    pub fn shutdown(&mut self) {
        self.cancel();
        self.timers.clear();
        self.expected_token = None;
        self.in_flight.clear();
    }

    /// Fires a due debounce timer and applies whatever responses arrived.
    /// Returns whether the visible result changed.
    pub fn poll(&mut self) -> bool {
        for code in self.timers.take_due() {
            self.debounce_timer = None;
            self.dispatch(code);
        }

        let mut responses = Vec::<CouponResponse>::new();
        self.in_flight
            .retain(|flight| match flight.receiver.try_recv() {
                Ok(response) => {
                    responses.push(response);
                    false
                }
                Err(TryRecvError::Empty) => true,
                Err(TryRecvError::Disconnected) => {
                    responses.push(CouponResponse::invalid(flight.token));
                    false
                }
            });

        let mut changed = false;
        for response in responses {
            changed |= self.accept(response);
        }
        changed
    }

    pub fn accept(&mut self, response: CouponResponse) -> bool {
        if Some(response.token) != self.expected_token {
            tracing::trace!(
                token = %response.token,
                expected = ?self.expected_token,
                "dropping stale coupon response"
            );
            return false;
        }

        tracing::debug!(
            token = %response.token,
            discount = ?response.record.discount,
            "coupon validated"
        );
        self.expected_token = None;
        self.result = CouponValidation::Resolved(response.record);
        true
    }

    fn dispatch(&mut self, code: String) {
        let token = self.last_token.next();
        self.last_token = token;
        self.expected_token = Some(token);

        tracing::debug!(%token, code = %code, "dispatching coupon lookup");
        let receiver = self.lookup.lookup(code, token);
        self.in_flight.push(InFlight { token, receiver });
    }
}

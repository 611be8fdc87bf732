use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crate::account::{Account, HostFlags};
use crate::checkout::{CheckoutEvent, CheckoutWidget, PaymentToken};
use crate::clock::{Clock, TimerHandle, TimerQueue};
use crate::coupon::{CouponLookup, CouponValidation};
use crate::dispatch::{UnlockDispatcher, UnlockMetadata};
use crate::validator::{DEFAULT_DEBOUNCE, DebouncedValidator};

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_PLAN: &str = "kactus-1-month";

/// Phase the dialog itself tracks. Unlocking and unlocked come from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prompting,
    LoadingCheckout,
    ShowingCheckout,
}

/// What the dialog shows on a given render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Prompting,
    LoadingCheckout,
    ShowingCheckout,
    Unlocking,
    Unlocked,
}

/// Entitlement wins over everything, an unlock in flight wins over the
/// dialog's own phase.
pub fn effective_state(phase: Phase, flags: HostFlags) -> FlowState {
    if flags.unlocked {
        return FlowState::Unlocked;
    }
    if flags.is_unlocking {
        return FlowState::Unlocking;
    }

    match phase {
        Phase::Prompting => FlowState::Prompting,
        Phase::LoadingCheckout => FlowState::LoadingCheckout,
        Phase::ShowingCheckout => FlowState::ShowingCheckout,
    }
}

/// A coupon that was typed but carries no discount blocks the unlock; no
/// coupon at all does not.
pub fn can_submit(validation: &CouponValidation) -> bool {
    match validation {
        CouponValidation::Unknown => true,
        CouponValidation::Pending => false,
        CouponValidation::Resolved(record) => record.has_discount(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub plan: String,
    pub enterprise: bool,
    pub debounce: Duration,
    pub dismiss_delay: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            plan: DEFAULT_PLAN.to_string(),
            enterprise: false,
            debounce: DEFAULT_DEBOUNCE,
            dismiss_delay: DEFAULT_DISMISS_DELAY,
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub lookup: Arc<dyn CouponLookup>,
    pub checkout: Arc<dyn CheckoutWidget>,
    pub dispatcher: Arc<dyn UnlockDispatcher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    UserCancelled,
    CheckoutDismissed,
    AutoDismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSignal {
    Continue,
    Dismissed(DismissReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowTimer {
    AutoDismiss,
}

pub struct UpsellFlow {
    user: Account,
    settings: FlowSettings,
    checkout: Arc<dyn CheckoutWidget>,
    dispatcher: Arc<dyn UnlockDispatcher>,
    validator: DebouncedValidator,
    coupon: String,
    phase: Phase,
    checkout_events: Option<Receiver<CheckoutEvent>>,
    unlock_dispatched: bool,
    timers: TimerQueue<FlowTimer>,
    dismiss_timer: Option<TimerHandle>,
    observed: Option<HostFlags>,
    alive: bool,
}

impl UpsellFlow {
    pub fn new(user: Account, settings: FlowSettings, collaborators: Collaborators) -> Self {
        let validator = DebouncedValidator::new(
            collaborators.lookup,
            collaborators.clock.clone(),
            settings.debounce,
        );

        Self {
            user,
            settings,
            checkout: collaborators.checkout,
            dispatcher: collaborators.dispatcher,
            validator,
            coupon: String::new(),
            phase: Phase::Prompting,
            checkout_events: None,
            unlock_dispatched: false,
            timers: TimerQueue::new(collaborators.clock),
            dismiss_timer: None,
            observed: None,
            alive: true,
        }
    }

    pub fn user(&self) -> &Account {
        &self.user
    }

    pub fn plan(&self) -> &str {
        &self.settings.plan
    }

    pub fn enterprise(&self) -> bool {
        self.settings.enterprise
    }

    pub fn coupon(&self) -> &str {
        &self.coupon
    }

    pub fn coupon_validation(&self) -> &CouponValidation {
        self.validator.result()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn unlock_dispatched(&self) -> bool {
        self.unlock_dispatched
    }

    pub fn dismiss_pending(&self) -> bool {
        self.dismiss_timer
            .is_some_and(|handle| self.timers.is_pending(handle))
    }

    pub fn state(&self) -> FlowState {
        effective_state(self.phase, self.observed.unwrap_or_default())
    }

    pub fn coupon_editable(&self) -> bool {
        self.alive && !self.settings.enterprise && self.state() == FlowState::Prompting
    }

    pub fn can_submit(&self) -> bool {
        self.alive && self.state() == FlowState::Prompting && can_submit(self.validator.result())
    }

    pub fn set_coupon(&mut self, code: &str) -> bool {
        if !self.coupon_editable() || self.coupon == code {
            return false;
        }

        self.coupon = code.to_string();
        self.validator.on_code_changed(code);
        true
    }

    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            tracing::debug!(validation = ?self.validator.result(), "unlock submit refused");
            return false;
        }

        self.validator.cancel();
        self.phase = Phase::LoadingCheckout;
        self.checkout_events = Some(self.checkout.open(&self.user, self.settings.enterprise));
        tracing::debug!(plan = %self.settings.plan, "loading checkout");
        true
    }

    pub fn dismiss(&mut self) -> FlowSignal {
        if !self.alive {
            return FlowSignal::Continue;
        }
        FlowSignal::Dismissed(DismissReason::UserCancelled)
    }

    /// Reads the host flags for this render. Re-arms the auto dismiss only on
    /// the falling edge of the unlocking flag.
    pub fn observe(&mut self, flags: HostFlags) {
        if !self.alive {
            return;
        }

        if let Some(previous) = self.observed
            && previous.is_unlocking
            && !flags.is_unlocking
            && !previous.unlocked
        {
            self.arm_auto_dismiss();
        }
        self.observed = Some(flags);
    }

    pub fn on_checkout_event(&mut self, event: CheckoutEvent) -> FlowSignal {
        if !self.alive {
            return FlowSignal::Continue;
        }

        match event {
            CheckoutEvent::Loaded => {
                if self.phase == Phase::LoadingCheckout {
                    tracing::debug!("checkout ready");
                    self.phase = Phase::ShowingCheckout;
                }
                FlowSignal::Continue
            }
            CheckoutEvent::Token(token) => {
                self.dispatch_unlock(token);
                FlowSignal::Continue
            }
            CheckoutEvent::Dismissed => FlowSignal::Dismissed(DismissReason::CheckoutDismissed),
        }
    }

    pub fn on_tick(&mut self) -> FlowSignal {
        if !self.alive {
            return FlowSignal::Continue;
        }

        self.validator.poll();

        let mut events = Vec::<CheckoutEvent>::new();
        let mut disconnected = false;
        if let Some(receiver) = &self.checkout_events {
            loop {
                match receiver.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            self.checkout_events = None;
        }

        for event in events {
            if let FlowSignal::Dismissed(reason) = self.on_checkout_event(event) {
                return FlowSignal::Dismissed(reason);
            }
        }

        for timer in self.timers.take_due() {
            match timer {
                FlowTimer::AutoDismiss => {
                    self.dismiss_timer = None;
                    tracing::debug!("auto dismissing upsell dialog");
                    return FlowSignal::Dismissed(DismissReason::AutoDismiss);
                }
            }
        }

        FlowSignal::Continue
    }

    /// Cancels both timers and stops reacting to anything still in flight.
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }

        self.alive = false;
        self.validator.shutdown();
        self.timers.clear();
        self.dismiss_timer = None;
        self.checkout_events = None;
        tracing::debug!("upsell dialog torn down");
    }

    fn arm_auto_dismiss(&mut self) {
        if self.dismiss_pending() {
            return;
        }

        self.dismiss_timer = Some(
            self.timers
                .schedule(self.settings.dismiss_delay, FlowTimer::AutoDismiss),
        );
        tracing::debug!(delay = ?self.settings.dismiss_delay, "unlock finished, dismiss armed");
    }

    fn dispatch_unlock(&mut self, token: PaymentToken) {
        if self.unlock_dispatched {
            tracing::warn!("ignoring repeated payment token");
            return;
        }
        if !matches!(self.phase, Phase::LoadingCheckout | Phase::ShowingCheckout) {
            tracing::warn!(phase = ?self.phase, "ignoring payment token outside checkout");
            return;
        }

        let coupon = if self.settings.enterprise {
            ""
        } else {
            self.coupon.as_str()
        };
        let metadata = UnlockMetadata::new(token.email, self.settings.enterprise, coupon);
        self.unlock_dispatched = true;
        tracing::debug!(login = %self.user.login, "dispatching unlock");
        self.dispatcher.unlock(&self.user, &token.id, metadata);
    }
}

impl Drop for UpsellFlow {
    fn drop(&mut self) {
        self.teardown();
    }
}

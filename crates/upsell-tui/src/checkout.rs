use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crossterm::event::{Event, KeyEvent};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;
use upsell_core::account::Account;
use upsell_core::checkout::{CheckoutEvent, CheckoutWidget, PaymentToken};

use crate::keymap;

/// Checkout widget backed by a form drawn in the terminal. It is ready as
/// soon as it opens.
#[derive(Default)]
pub struct TerminalCheckout {
    sender: Mutex<Option<Sender<CheckoutEvent>>>,
}

impl TerminalCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.sender
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub(crate) fn submit(&self, token: PaymentToken) -> bool {
        self.send(CheckoutEvent::Token(token))
    }

    pub(crate) fn dismiss(&self) -> bool {
        let sent = self.send(CheckoutEvent::Dismissed);
        if let Ok(mut guard) = self.sender.lock() {
            *guard = None;
        }
        sent
    }

    fn send(&self, event: CheckoutEvent) -> bool {
        let Ok(guard) = self.sender.lock() else {
            return false;
        };
        guard
            .as_ref()
            .is_some_and(|sender| sender.send(event).is_ok())
    }
}

impl CheckoutWidget for TerminalCheckout {
    fn open(&self, user: &Account, enterprise: bool) -> Receiver<CheckoutEvent> {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(CheckoutEvent::Loaded);
        tracing::debug!(login = %user.login, enterprise, "terminal checkout opened");

        if let Ok(mut guard) = self.sender.lock() {
            *guard = Some(sender);
        }
        receiver
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormField {
    Email,
    TokenId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormAction {
    Edited,
    Submit(PaymentToken),
    Cancel,
    Ignored,
}

#[derive(Debug, Clone)]
pub(crate) struct CheckoutForm {
    pub(crate) email: Input,
    pub(crate) token_id: Input,
    pub(crate) focus: FormField,
    pub(crate) error: Option<String>,
}

impl CheckoutForm {
    pub(crate) fn new(email: &str) -> Self {
        let focus = if email.is_empty() {
            FormField::Email
        } else {
            FormField::TokenId
        };
        Self {
            email: Input::new(email.to_string()),
            token_id: Input::default(),
            focus,
            error: None,
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) -> FormAction {
        if keymap::is_back(key) {
            return FormAction::Cancel;
        }

        if keymap::is_next_field(key) || keymap::is_previous_field(key) {
            self.focus = match self.focus {
                FormField::Email => FormField::TokenId,
                FormField::TokenId => FormField::Email,
            };
            return FormAction::Edited;
        }

        if keymap::is_confirm(key) {
            return match self.payment_token() {
                Ok(token) => {
                    self.error = None;
                    FormAction::Submit(token)
                }
                Err(message) => {
                    self.error = Some(message);
                    FormAction::Edited
                }
            };
        }

        let input = match self.focus {
            FormField::Email => &mut self.email,
            FormField::TokenId => &mut self.token_id,
        };
        if input.handle_event(&Event::Key(key)).is_some() {
            self.error = None;
            return FormAction::Edited;
        }

        FormAction::Ignored
    }

    fn payment_token(&self) -> Result<PaymentToken, String> {
        let email = self.email.value().trim();
        let id = self.token_id.value().trim();

        if !email.contains('@') {
            return Err("enter the receipt email address".to_string());
        }
        if id.is_empty() {
            return Err("enter the payment token id".to_string());
        }

        Ok(PaymentToken {
            id: id.to_string(),
            email: email.to_string(),
        })
    }
}

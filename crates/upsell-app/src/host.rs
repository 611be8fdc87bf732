use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use upsell_core::account::{Account, HostFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockEvent {
    Started,
    Finished { entitled: bool },
}

/// Owns the account record and the two flags the dialog reads. Unlock
/// progress arrives over a channel from the dispatcher.
pub struct AccountHost {
    account: Account,
    is_unlocking: bool,
    events: Receiver<UnlockEvent>,
    sender: Sender<UnlockEvent>,
}

impl AccountHost {
    pub fn new(account: Account) -> Self {
        let (sender, events) = mpsc::channel();
        Self {
            account,
            is_unlocking: false,
            events,
            sender,
        }
    }

    pub fn sender(&self) -> Sender<UnlockEvent> {
        self.sender.clone()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn is_unlocking(&self) -> bool {
        self.is_unlocking
    }

    pub fn flags(&self) -> HostFlags {
        HostFlags::for_account(&self.account, self.is_unlocking)
    }

    /// Applies at most one event so every flag edge is seen by one render.
    pub fn poll(&mut self) -> bool {
        match self.events.try_recv() {
            Ok(event) => {
                self.apply(event);
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    pub fn apply(&mut self, event: UnlockEvent) {
        match event {
            UnlockEvent::Started => {
                tracing::debug!(login = %self.account.login, "unlock started");
                self.is_unlocking = true;
            }
            UnlockEvent::Finished { entitled } => {
                tracing::debug!(login = %self.account.login, entitled, "unlock finished");
                self.is_unlocking = false;
                if entitled {
                    self.account.unlocked_kactus = true;
                }
            }
        }
    }
}

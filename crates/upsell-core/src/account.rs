use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub unlocked_kactus: bool,
}

impl Account {
    pub fn new(login: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            email: email.into(),
            unlocked_kactus: false,
        }
    }
}

/// Flags owned by the host application. The dialog only reads them, once per
/// render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostFlags {
    pub is_unlocking: bool,
    pub unlocked: bool,
}

impl HostFlags {
    pub fn new(is_unlocking: bool, unlocked: bool) -> Self {
        Self {
            is_unlocking,
            unlocked,
        }
    }

    pub fn for_account(account: &Account, is_unlocking: bool) -> Self {
        Self::new(is_unlocking, account.unlocked_kactus)
    }
}

#[cfg(test)]
mod tests {
    use super::{Account, HostFlags};

    #[test]
    fn host_flags_read_entitlement_from_account() {
        let mut account = Account::new("octocat", "octocat@example.com");
        assert_eq!(HostFlags::for_account(&account, true), HostFlags::new(true, false));

        account.unlocked_kactus = true;
        assert_eq!(HostFlags::for_account(&account, false), HostFlags::new(false, true));
    }
}

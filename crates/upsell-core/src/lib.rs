pub mod account;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod coupon;
pub mod dispatch;
pub mod flow;
#[cfg(test)]
pub(crate) mod test_support;
pub mod time;
pub mod validator;

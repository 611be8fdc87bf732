pub mod doctor;
pub mod error;
pub mod host;
pub mod http;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use upsell_core::checkout::CheckoutWidget;
use upsell_core::clock::Clock;
use upsell_core::config::{UpsellConfig, load_config, resolve_config_path};
use upsell_core::coupon::{CouponLookupError, CouponRecord, RequestToken};
use upsell_core::flow::{Collaborators, UpsellFlow};

use crate::doctor::{DoctorReport, run_doctor};
use crate::error::AppError;
use crate::host::AccountHost;
use crate::http::{HttpCouponLookup, HttpUnlockDispatcher};
use crate::transport::{ApiTransport, ReqwestTransport};

/// A mounted dialog together with the host that feeds it flags.
pub struct UpsellSession {
    pub flow: UpsellFlow,
    pub host: AccountHost,
}

pub struct App {
    pub transport: Arc<dyn ApiTransport>,
}

impl App {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    pub fn with_reqwest() -> Result<Self> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    pub fn doctor(&self) -> Result<DoctorReport> {
        Ok(run_doctor(self.transport.as_ref()))
    }

    pub fn ensure_config_ready(&self) -> Result<UpsellConfig> {
        let config_path = resolve_config_path().context("failed to resolve config path")?;
        Ok(self.load_config_at(&config_path)?)
    }

    pub fn load_config_at(&self, path: &Path) -> Result<UpsellConfig, AppError> {
        if !path.exists() {
            return Err(AppError::MissingConfig {
                path: path.to_path_buf(),
            });
        }

        load_config(path).map_err(|error| AppError::InvalidConfig {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// One blocking lookup. An unknown code is a normal answer, a broken
    /// service is an error.
    pub fn check_coupon(&self, config: &UpsellConfig, code: &str) -> Result<CouponRecord> {
        let code = code.trim();
        if code.is_empty() {
            bail!("coupon code must be non-empty");
        }

        let lookup = self.coupon_lookup(config);
        let token = RequestToken::new(1);
        match lookup.fetch(code, token) {
            Ok(response) => {
                if response.token != token {
                    tracing::warn!(
                        sent = %token,
                        echoed = %response.token,
                        "coupon service echoed a different request id"
                    );
                }
                Ok(response.record)
            }
            Err(CouponLookupError::NotFound { .. }) => Ok(CouponRecord {
                code: Some(code.to_string()),
                discount: None,
            }),
            Err(error) => {
                Err(error).with_context(|| format!("failed to check coupon '{code}'"))
            }
        }
    }

    pub fn open_upsell(
        &self,
        config: &UpsellConfig,
        checkout: Arc<dyn CheckoutWidget>,
        clock: Arc<dyn Clock>,
    ) -> UpsellSession {
        let host = AccountHost::new(config.account());
        let dispatcher = HttpUnlockDispatcher::new(
            self.transport.clone(),
            config.api_base_url(),
            config.request_timeout(),
            host.sender(),
        );

        let collaborators = Collaborators {
            lookup: Arc::new(self.coupon_lookup(config)),
            checkout,
            dispatcher: Arc::new(dispatcher),
            clock,
        };

        tracing::debug!(
            login = %config.account.login,
            plan = %config.upsell.plan,
            enterprise = config.upsell.enterprise,
            "opening upsell dialog"
        );
        let flow = UpsellFlow::new(config.account(), config.flow_settings(), collaborators);
        UpsellSession { flow, host }
    }

    fn coupon_lookup(&self, config: &UpsellConfig) -> HttpCouponLookup {
        HttpCouponLookup::new(
            self.transport.clone(),
            config.api_base_url(),
            config.request_timeout(),
        )
    }
}

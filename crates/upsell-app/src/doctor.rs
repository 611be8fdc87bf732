use std::fmt;
use std::path::Path;

use upsell_core::config::{UpsellConfig, load_config, resolve_config_path};

use crate::transport::ApiTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pass,
    Fail,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub state: CheckState,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.state == CheckState::Fail)
    }

    pub fn summary(&self) -> String {
        let passed = self
            .checks
            .iter()
            .filter(|check| check.state == CheckState::Pass)
            .count();
        let failed = self.checks.len().saturating_sub(passed);
        format!("{passed} passed, {failed} failed")
    }
}

const CONFIG_DEPENDENT: &[&str] = &[
    "config parses and validates",
    "coupon service reachable",
];

pub fn run_doctor(transport: &dyn ApiTransport) -> DoctorReport {
    let mut checks = Vec::new();

    match resolve_config_path() {
        Ok(config_path) => {
            checks.push(pass_check(
                "config path resolves",
                config_path.display().to_string(),
            ));
            check_config_file(&mut checks, transport, &config_path);
        }
        Err(error) => {
            checks.push(fail_check("config path resolves", error.to_string()));
            push_skipped_checks(
                &mut checks,
                &["config file exists"],
                "config path could not be resolved",
            );
            push_skipped_checks(
                &mut checks,
                CONFIG_DEPENDENT,
                "config path could not be resolved",
            );
        }
    }

    DoctorReport { checks }
}

fn check_config_file(checks: &mut Vec<DoctorCheck>, transport: &dyn ApiTransport, path: &Path) {
    if !path.exists() {
        checks.push(fail_check(
            "config file exists",
            format!("expected at {}", path.display()),
        ));
        push_skipped_checks(checks, CONFIG_DEPENDENT, "config file is missing");
        return;
    }

    checks.push(pass_check(
        "config file exists",
        format!("found at {}", path.display()),
    ));

    match load_config(path) {
        Ok(config) => {
            checks.push(pass_check("config parses and validates", "config is valid"));
            checks.push(check_api_reachable(transport, &config));
        }
        Err(error) => {
            checks.push(fail_check("config parses and validates", error.to_string()));
            checks.push(skipped_check(
                "coupon service reachable",
                "config is invalid",
            ));
        }
    }
}

/// Any HTTP answer below 500 means the service is up; a 404 for the probe
/// code is the expected reply.
fn check_api_reachable(transport: &dyn ApiTransport, config: &UpsellConfig) -> DoctorCheck {
    let url = format!("{}/coupons/doctor-probe", config.api_base_url());
    match transport.get(&url, config.request_timeout()) {
        Ok(reply) if reply.status < 500 => pass_check(
            "coupon service reachable",
            format!("{} answered with status {}", config.api_base_url(), reply.status),
        ),
        Ok(reply) => fail_check(
            "coupon service reachable",
            format!("{} answered with status {}", config.api_base_url(), reply.status),
        ),
        Err(error) => fail_check(
            "coupon service reachable",
            format!("request failed: {error:#}"),
        ),
    }
}

fn pass_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Pass,
        details: details.into(),
    }
}

fn fail_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Fail,
        details: details.into(),
    }
}

fn skipped_check(name: &str, reason: &str) -> DoctorCheck {
    fail_check(name, format!("skipped because {reason}"))
}

fn push_skipped_checks(checks: &mut Vec<DoctorCheck>, names: &[&str], reason: &str) {
    checks.extend(
        names
            .iter()
            .copied()
            .map(|name| skipped_check(name, reason)),
    );
}

use anyhow::Result;
use comfy_table::{Cell, ContentArrangement, Table};
use upsell_app::App;
use upsell_app::doctor::{CheckState, DoctorReport};
use upsell_core::coupon::CouponRecord;
use upsell_tui::{UiExit, UiOutcome};

use crate::cli::{Cli, Command};

pub fn run_with_deps(cli: Cli, app: &App) -> Result<()> {
    match cli.command {
        Some(Command::Doctor) => run_doctor_command(app),
        Some(Command::Coupon { code }) => run_coupon_command(app, &code),
        None => run_root_command(app),
    }
}

fn run_root_command(app: &App) -> Result<()> {
    let config = app.ensure_config_ready()?;
    let outcome = upsell_tui::run_upsell(app, &config)?;
    println!("{}", outcome_message(&outcome, &config.account.login));
    Ok(())
}

fn run_coupon_command(app: &App, code: &str) -> Result<()> {
    let config = app.ensure_config_ready()?;
    let record = app.check_coupon(&config, code)?;
    println!("{}", coupon_table(code.trim(), &record));
    Ok(())
}

fn run_doctor_command(app: &App) -> Result<()> {
    let report = app.doctor()?;
    print_doctor_report(&report);
    Ok(())
}

fn outcome_message(outcome: &UiOutcome, login: &str) -> String {
    if outcome.unlocked {
        return format!("Kactus full access is unlocked for {login}.");
    }

    match outcome.exit {
        UiExit::Canceled => "Canceled.".to_string(),
        UiExit::Dismissed(_) => "Kactus is still locked.".to_string(),
    }
}

fn coupon_table(code: &str, record: &CouponRecord) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Coupon", "Discount", "Usable"]);

    let discount = match record.discount {
        Some(discount) => format!("{discount}%"),
        None => "-".to_string(),
    };
    let usable = if record.has_discount() { "yes" } else { "no" };
    table.add_row(vec![
        Cell::new(record.code.as_deref().unwrap_or(code)),
        Cell::new(discount),
        Cell::new(usable),
    ]);
    table
}

fn print_doctor_report(report: &DoctorReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Details"]);

    for check in &report.checks {
        let status = match check.state {
            CheckState::Pass => "PASS",
            CheckState::Fail => "FAIL",
        };

        table.add_row(vec![
            Cell::new(check.name.as_str()),
            Cell::new(status),
            Cell::new(check.details.as_str()),
        ]);
    }

    println!("{table}");
    println!("{}", report.summary());
}

mod checkout;
mod keymap;
mod screen;
mod theme;
mod ui;

use std::io::{Stdout, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use upsell_app::{App, UpsellSession};
use upsell_core::clock::SystemClock;
use upsell_core::config::UpsellConfig;
use upsell_core::flow::{DismissReason, FlowSignal};

pub use checkout::TerminalCheckout;
use screen::UpsellScreen;

const TICK_RATE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Dismissed(DismissReason),
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOutcome {
    pub exit: UiExit,
    pub unlocked: bool,
}

pub(crate) struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub(crate) fn enter() -> Result<Self> {
        let terminal = enter_with_ops(
            || enable_raw_mode().context("failed to enable raw mode"),
            || {
                let mut out = stdout();
                execute!(out, EnterAlternateScreen, Hide)
                    .context("failed to enter alternate screen")
            },
            || {
                let backend = CrosstermBackend::new(stdout());
                Terminal::new(backend).context("failed to create terminal backend")
            },
            || {
                let mut out = stdout();
                execute!(out, Show, LeaveAlternateScreen)
                    .context("failed to restore terminal screen during rollback")
            },
            || disable_raw_mode().context("failed to disable raw mode during rollback"),
        )?;
        Ok(Self { terminal })
    }

    pub(crate) fn draw<F>(&mut self, draw_fn: F) -> Result<()>
    where
        F: FnOnce(&mut ratatui::Frame<'_>),
    {
        self.terminal
            .draw(draw_fn)
            .context("failed to render terminal")?;
        Ok(())
    }

    pub(crate) fn autoresize(&mut self) -> Result<()> {
        self.terminal
            .autoresize()
            .context("failed to autoresize terminal")?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.terminal.backend_mut(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Runs the setup steps in order and undoes the completed ones when a later
/// step fails.
fn enter_with_ops<T, EnableRawMode, EnterAltScreen, CreateTerminal, LeaveAltScreen, DisableRawMode>(
    mut enable_raw_mode_op: EnableRawMode,
    mut enter_alt_screen_op: EnterAltScreen,
    mut create_terminal_op: CreateTerminal,
    mut leave_alt_screen_op: LeaveAltScreen,
    mut disable_raw_mode_op: DisableRawMode,
) -> Result<T>
where
    EnableRawMode: FnMut() -> Result<()>,
    EnterAltScreen: FnMut() -> Result<()>,
    CreateTerminal: FnMut() -> Result<T>,
    LeaveAltScreen: FnMut() -> Result<()>,
    DisableRawMode: FnMut() -> Result<()>,
{
    enable_raw_mode_op()?;

    if let Err(error) = enter_alt_screen_op() {
        let cleanup = disable_raw_mode_op().err();
        return Err(with_cleanup_failures(error, cleanup.into_iter().collect()));
    }

    match create_terminal_op() {
        Ok(terminal) => Ok(terminal),
        Err(error) => {
            let cleanup = [leave_alt_screen_op().err(), disable_raw_mode_op().err()]
                .into_iter()
                .flatten()
                .collect();
            Err(with_cleanup_failures(error, cleanup))
        }
    }
}

fn with_cleanup_failures(setup_error: anyhow::Error, cleanup: Vec<anyhow::Error>) -> anyhow::Error {
    if cleanup.is_empty() {
        return setup_error;
    }

    let details = cleanup
        .iter()
        .map(|error| format!("{error:#}"))
        .collect::<Vec<_>>()
        .join("\n");
    anyhow!("{setup_error:#}\nterminal rollback cleanup failed: {details}")
}

/// Mounts the dialog and drives it until it asks to be dismissed or the
/// user presses Ctrl-C.
pub fn run_upsell(app: &App, config: &UpsellConfig) -> Result<UiOutcome> {
    let checkout = Arc::new(TerminalCheckout::new());
    let UpsellSession { mut flow, mut host } =
        app.open_upsell(config, checkout.clone(), Arc::new(SystemClock::new()));
    let mut screen = UpsellScreen::new(checkout);
    let mut terminal = TerminalSession::enter()?;

    let exit = loop {
        host.poll();
        flow.observe(host.flags());
        if let FlowSignal::Dismissed(reason) = flow.on_tick() {
            break UiExit::Dismissed(reason);
        }
        screen.on_tick(&flow);

        terminal.draw(|frame| screen.render(frame, &flow))?;

        if !event::poll(TICK_RATE).context("failed to poll terminal event")? {
            continue;
        }

        let key = match event::read().context("failed to read terminal event")? {
            Event::Resize(_, _) => {
                terminal.autoresize()?;
                continue;
            }
            Event::Key(key) if matches!(key.kind, KeyEventKind::Press) => key,
            _ => continue,
        };

        if keymap::is_ctrl_c(key) {
            break UiExit::Canceled;
        }

        if let FlowSignal::Dismissed(reason) = screen.on_key(key, &mut flow) {
            break UiExit::Dismissed(reason);
        }
    };

    flow.teardown();
    tracing::debug!(?exit, unlocked = host.flags().unlocked, "upsell dialog closed");
    Ok(UiOutcome {
        exit,
        unlocked: host.flags().unlocked,
    })
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let pct_x = percent_x.min(100);
    let pct_y = percent_y.min(100);

    let [_, vertical, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .areas(area);
    let [_, horizontal, _] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .areas(vertical);
    horizontal
}

use std::sync::Arc;

use crossterm::event::{Event, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Margin, Rect};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;
use upsell_core::coupon::CouponValidation;
use upsell_core::flow::{FlowSignal, FlowState, UpsellFlow};

use crate::checkout::{CheckoutForm, FormAction, FormField, TerminalCheckout};
use crate::keymap;
use crate::theme;
use crate::ui::loading::Spinner;
use crate::ui::modal::{ModalSpec, render_modal};
use crate::ui::text::{compact_hint, error_line, focus_line, label_value_line};

const COUPON_LABEL: &str = "Coupon: ";
const EMAIL_LABEL: &str = "Email: ";
const TOKEN_LABEL: &str = "Payment token: ";

/// Terminal presentation of one upsell dialog. The flow owns the state; this
/// only keeps the text inputs and the spinner.
pub(crate) struct UpsellScreen {
    checkout: Arc<TerminalCheckout>,
    coupon: Input,
    form: Option<CheckoutForm>,
    spinner: Spinner,
}

impl UpsellScreen {
    pub(crate) fn new(checkout: Arc<TerminalCheckout>) -> Self {
        Self {
            checkout,
            coupon: Input::default(),
            form: None,
            spinner: Spinner::default(),
        }
    }

    pub(crate) fn on_tick(&mut self, flow: &UpsellFlow) {
        self.spinner.next_frame();

        if flow.state() == FlowState::ShowingCheckout
            && self.form.is_none()
            && self.checkout.is_open()
        {
            self.form = Some(CheckoutForm::new(&flow.user().email));
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent, flow: &mut UpsellFlow) -> FlowSignal {
        match flow.state() {
            FlowState::Prompting => self.on_key_prompt(key, flow),
            FlowState::LoadingCheckout | FlowState::Unlocking => {
                if keymap::is_back(key) {
                    return flow.dismiss();
                }
                FlowSignal::Continue
            }
            FlowState::ShowingCheckout => self.on_key_checkout(key, flow),
            FlowState::Unlocked => {
                if keymap::is_back(key) || keymap::is_confirm(key) {
                    return flow.dismiss();
                }
                FlowSignal::Continue
            }
        }
    }

    fn on_key_prompt(&mut self, key: KeyEvent, flow: &mut UpsellFlow) -> FlowSignal {
        if keymap::is_back(key) {
            return flow.dismiss();
        }

        if keymap::is_confirm(key) {
            flow.submit();
            return FlowSignal::Continue;
        }

        if flow.coupon_editable() && self.coupon.handle_event(&Event::Key(key)).is_some() {
            flow.set_coupon(self.coupon.value());
        }
        FlowSignal::Continue
    }

    fn on_key_checkout(&mut self, key: KeyEvent, flow: &UpsellFlow) -> FlowSignal {
        let form = self
            .form
            .get_or_insert_with(|| CheckoutForm::new(&flow.user().email));

        match form.on_key(key) {
            FormAction::Submit(token) => {
                if flow.unlock_dispatched() {
                    form.error = Some("payment already submitted".to_string());
                } else if !self.checkout.submit(token) {
                    form.error = Some("checkout is no longer open".to_string());
                }
            }
            FormAction::Cancel => {
                self.checkout.dismiss();
            }
            FormAction::Edited | FormAction::Ignored => {}
        }
        FlowSignal::Continue
    }

    pub(crate) fn render(&self, frame: &mut Frame<'_>, flow: &UpsellFlow) {
        match flow.state() {
            FlowState::Prompting => self.render_prompt(frame, flow),
            FlowState::LoadingCheckout => self.render_waiting(
                frame,
                "Loading checkout",
                "Preparing checkout...",
                "Esc: cancel",
            ),
            FlowState::ShowingCheckout => self.render_checkout(frame, flow),
            FlowState::Unlocking => self.render_waiting(
                frame,
                "Unlocking",
                &format!("Unlocking Kactus for {}...", flow.user().login),
                "Esc: close",
            ),
            FlowState::Unlocked => render_unlocked(frame, flow),
        }
    }

    fn render_prompt(&self, frame: &mut Frame<'_>, flow: &UpsellFlow) {
        let mut lines = vec![Line::from("")];
        if flow.enterprise() {
            lines.push(focus_line("Unlock Kactus for your enterprise account"));
        } else {
            lines.push(focus_line("Unlock Kactus full access"));
            lines.push(Line::from(
                "Share components across projects and design files.",
            ));
        }
        lines.push(label_value_line("Plan", flow.plan()));

        let coupon_row = (!flow.enterprise()).then(|| {
            lines.push(Line::from(""));
            let row = lines.len();
            lines.push(Line::from(Span::styled(COUPON_LABEL, theme::secondary_text())));
            lines.push(self.coupon_status_line(flow.coupon_validation()));
            row
        });

        let unlock_hint = if flow.can_submit() {
            Span::raw("Enter: unlock")
        } else {
            Span::styled("Enter: unlock", theme::disabled_action())
        };
        lines.push(Line::from(""));
        lines.push(Line::from(vec![unlock_hint, Span::raw("    Esc: not now")]));

        let key_text = compact_hint(
            frame.area().width,
            "Type a coupon    Enter: unlock    Esc: not now",
            "Enter unlock | Esc not now",
        );
        let rendered = render_modal(
            frame,
            ModalSpec {
                title: "Kactus",
                title_style: theme::focus_prompt(),
                body: Text::from(lines),
                key_hint: Some(key_text),
                width_pct: 72,
                height_pct: 56,
            },
        );

        if let Some(row) = coupon_row {
            render_input_row(frame, rendered.body_area, row, COUPON_LABEL, &self.coupon, true);
        }
    }

    fn coupon_status_line(&self, validation: &CouponValidation) -> Line<'static> {
        match validation {
            CouponValidation::Unknown => {
                Line::from(Span::styled("No coupon applied", theme::secondary_text()))
            }
            CouponValidation::Pending => Line::from(format!(
                "{} Checking coupon...",
                self.spinner.current_frame()
            )),
            CouponValidation::Resolved(record) => match record.discount {
                Some(discount) if record.has_discount() => Line::from(Span::styled(
                    format!("{discount}% off applied"),
                    theme::success_prompt(),
                )),
                _ => error_line("This coupon gives no discount"),
            },
        }
    }

    fn render_checkout(&self, frame: &mut Frame<'_>, flow: &UpsellFlow) {
        let Some(form) = &self.form else {
            self.render_waiting(frame, "Checkout", "Opening checkout...", "Esc: cancel");
            return;
        };

        let mut lines = vec![
            Line::from(""),
            label_value_line("Plan", flow.plan()),
            Line::from(""),
        ];
        let email_row = lines.len();
        lines.push(Line::from(Span::styled(EMAIL_LABEL, theme::secondary_text())));
        let token_row = lines.len();
        lines.push(Line::from(Span::styled(TOKEN_LABEL, theme::secondary_text())));
        if let Some(error) = &form.error {
            lines.push(Line::from(""));
            lines.push(error_line(format!("Invalid: {error}")));
        }

        let key_text = compact_hint(
            frame.area().width,
            "Enter: pay    Tab: next field    Esc: cancel",
            "Enter pay | Tab field | Esc cancel",
        );
        let rendered = render_modal(
            frame,
            ModalSpec {
                title: "Checkout",
                title_style: theme::focus_prompt(),
                body: Text::from(lines),
                key_hint: Some(key_text),
                width_pct: 72,
                height_pct: 50,
            },
        );

        render_input_row(
            frame,
            rendered.body_area,
            email_row,
            EMAIL_LABEL,
            &form.email,
            form.focus == FormField::Email,
        );
        render_input_row(
            frame,
            rendered.body_area,
            token_row,
            TOKEN_LABEL,
            &form.token_id,
            form.focus == FormField::TokenId,
        );
    }

    fn render_waiting(&self, frame: &mut Frame<'_>, title: &str, message: &str, key_hint: &str) {
        let body = Text::from(vec![
            Line::from(""),
            Line::from(format!("{} {}", self.spinner.current_frame(), message)),
        ]);
        render_modal(
            frame,
            ModalSpec {
                title,
                title_style: theme::focus_prompt(),
                body,
                key_hint: Some(key_hint),
                width_pct: 60,
                height_pct: 30,
            },
        );
    }
}

fn render_unlocked(frame: &mut Frame<'_>, flow: &UpsellFlow) {
    let body = Text::from(vec![
        Line::from(""),
        Line::from(format!("Kactus is unlocked for {}.", flow.user().login)),
        Line::from("You now have full access."),
    ]);
    render_modal(
        frame,
        ModalSpec {
            title: "Success",
            title_style: theme::success_prompt(),
            body,
            key_hint: Some("Enter/Esc: close"),
            width_pct: 60,
            height_pct: 30,
        },
    );
}

/// Draws `input` after `label` on body line `row` and places the cursor
/// there when focused.
fn render_input_row(
    frame: &mut Frame<'_>,
    body_area: Rect,
    row: usize,
    label: &str,
    input: &Input,
    focused: bool,
) {
    let inner = body_area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let label_width = label.chars().count() as u16;
    let Ok(row) = u16::try_from(row) else {
        return;
    };
    if row >= inner.height || label_width >= inner.width {
        return;
    }

    let area = Rect::new(
        inner.x + label_width,
        inner.y + row,
        inner.width - label_width,
        1,
    );
    let width = area.width as usize;
    let scroll = input.visual_scroll(width);
    let paragraph = Paragraph::new(input.value()).scroll((0, scroll as u16));
    frame.render_widget(paragraph, area);

    if focused && width > 0 {
        let relative = input
            .visual_cursor()
            .saturating_sub(scroll)
            .min(width.saturating_sub(1));
        frame.set_cursor_position((area.x + relative as u16, area.y));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use upsell_core::account::{Account, HostFlags};
    use upsell_core::clock::ManualClock;
    use upsell_core::coupon::{CouponLookup, CouponResponse, RequestToken};
    use upsell_core::dispatch::{UnlockDispatcher, UnlockMetadata};
    use upsell_core::flow::{
        Collaborators, DismissReason, FlowSettings, FlowSignal, FlowState, UpsellFlow,
    };

    use super::UpsellScreen;
    use crate::checkout::TerminalCheckout;

    #[derive(Default)]
    struct SilentLookup {
        senders: Mutex<Vec<Sender<CouponResponse>>>,
    }

    impl CouponLookup for SilentLookup {
        fn lookup(&self, _code: String, _token: RequestToken) -> Receiver<CouponResponse> {
            let (sender, receiver) = mpsc::channel();
            self.senders.lock().expect("senders lock").push(sender);
            receiver
        }
    }

    struct NoopDispatcher;

    impl UnlockDispatcher for NoopDispatcher {
        fn unlock(&self, _user: &Account, _payment_token_id: &str, _metadata: UnlockMetadata) {}
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mount(settings: FlowSettings) -> (Arc<TerminalCheckout>, UpsellFlow) {
        let clock = Arc::new(ManualClock::new());
        let checkout = Arc::new(TerminalCheckout::new());
        let flow = UpsellFlow::new(
            Account::new("octocat", "octocat@example.com"),
            settings,
            Collaborators {
                lookup: Arc::new(SilentLookup::default()),
                checkout: checkout.clone(),
                dispatcher: Arc::new(NoopDispatcher),
                clock,
            },
        );
        (checkout, flow)
    }

    fn screen_text(screen: &UpsellScreen, flow: &UpsellFlow) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal
            .draw(|frame| screen.render(frame, flow))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn typing_updates_the_coupon_and_blocks_unlock_while_pending() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let mut screen = UpsellScreen::new(checkout);

        for ch in "SAVE".chars() {
            screen.on_key(key(KeyCode::Char(ch)), &mut flow);
        }
        assert_eq!(flow.coupon(), "SAVE");
        assert!(!flow.can_submit());

        screen.on_key(key(KeyCode::Enter), &mut flow);
        assert_eq!(flow.state(), FlowState::Prompting);
        assert!(screen_text(&screen, &flow).contains("Checking coupon"));
    }

    #[test]
    fn erasing_the_coupon_allows_unlock_again() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let mut screen = UpsellScreen::new(checkout);

        screen.on_key(key(KeyCode::Char('X')), &mut flow);
        screen.on_key(key(KeyCode::Backspace), &mut flow);
        assert_eq!(flow.coupon(), "");
        assert!(flow.can_submit());
    }

    #[test]
    fn escape_on_prompt_dismisses() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let mut screen = UpsellScreen::new(checkout);

        assert_eq!(
            screen.on_key(key(KeyCode::Esc), &mut flow),
            FlowSignal::Dismissed(DismissReason::UserCancelled)
        );
    }

    #[test]
    fn enterprise_prompt_hides_coupon_entry() {
        let settings = FlowSettings {
            enterprise: true,
            ..FlowSettings::default()
        };
        let (checkout, mut flow) = mount(settings);
        let mut screen = UpsellScreen::new(checkout);

        screen.on_key(key(KeyCode::Char('X')), &mut flow);
        assert_eq!(flow.coupon(), "");

        let text = screen_text(&screen, &flow);
        assert!(text.contains("enterprise account"));
        assert!(!text.contains("Coupon:"));
    }

    #[test]
    fn submit_opens_terminal_checkout_form() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let mut screen = UpsellScreen::new(checkout.clone());
        flow.observe(HostFlags::default());

        screen.on_key(key(KeyCode::Enter), &mut flow);
        assert!(checkout.is_open());
        flow.on_tick();
        screen.on_tick(&flow);

        assert_eq!(flow.state(), FlowState::ShowingCheckout);
        assert!(screen_text(&screen, &flow).contains("Payment token:"));
    }

    #[test]
    fn escape_in_checkout_dismisses_through_the_widget() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let mut screen = UpsellScreen::new(checkout);
        screen.on_key(key(KeyCode::Enter), &mut flow);
        flow.on_tick();
        screen.on_tick(&flow);

        assert_eq!(screen.on_key(key(KeyCode::Esc), &mut flow), FlowSignal::Continue);
        assert_eq!(
            flow.on_tick(),
            FlowSignal::Dismissed(DismissReason::CheckoutDismissed)
        );
    }

    #[test]
    fn unlocked_view_shows_success() {
        let (checkout, mut flow) = mount(FlowSettings::default());
        let screen = UpsellScreen::new(checkout);
        flow.observe(HostFlags::new(false, true));

        assert_eq!(flow.state(), FlowState::Unlocked);
        assert!(screen_text(&screen, &flow).contains("You now have full access."));
    }
}

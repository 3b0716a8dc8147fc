//! Stopwatch and countdown timer.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use super::clock::{Interval, format_hms};
use super::{AppContext, AppEvent, ButtonRow, HostedApp};
use crate::constants::TICK_PERIOD;
use crate::ui::UiFrame;
use crate::view::{Marker, SectionLayout, ViewNode, ViewTemplate};
use crate::window::Size;

pub const INVALID_SECONDS: &str = "Please enter a valid number of seconds.";

const MAX_INPUT_DIGITS: usize = 7;

pub fn template() -> ViewTemplate {
    ViewTemplate::new(Size::new(36, 13))
        .child(ViewNode::header([
            ViewNode::title("Timer"),
            ViewNode::close_button("x"),
        ]))
        .child(ViewNode::section("stopwatch", Constraint::Length(4)))
        .child(ViewNode::section("timer", Constraint::Min(5)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    StartStopwatch,
    PauseStopwatch,
    StopStopwatch,
    ResetStopwatch,
    StartTimer,
    StopTimer,
}

#[derive(Debug)]
pub struct TimerApp {
    ctx: AppContext,
    now: Instant,
    shown: bool,
    stopwatch_secs: u64,
    stopwatch: Option<Interval>,
    timer_secs: u64,
    timer: Option<Interval>,
    input: String,
    alarm: bool,
    message: Option<String>,
    stopwatch_buttons: ButtonRow<Action>,
    timer_buttons: ButtonRow<Action>,
}

impl TimerApp {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            now: Instant::now(),
            shown: false,
            stopwatch_secs: 0,
            stopwatch: None,
            timer_secs: 0,
            timer: None,
            input: String::new(),
            alarm: false,
            message: None,
            stopwatch_buttons: ButtonRow::default(),
            timer_buttons: ButtonRow::default(),
        }
    }

    pub fn stopwatch_display(&self) -> String {
        format_hms(self.stopwatch_secs)
    }

    pub fn timer_display(&self) -> String {
        format_hms(self.timer_secs)
    }

    pub fn stopwatch_running(&self) -> bool {
        self.stopwatch.is_some()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_some()
    }

    /// True while either clock counts; the tick sound of the web desktop.
    pub fn ticking(&self) -> bool {
        self.stopwatch_running() || self.timer_running()
    }

    pub fn alarm(&self) -> bool {
        self.alarm
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
    }

    pub fn start_stopwatch(&mut self) {
        self.stopwatch = Some(Interval::start(self.now, TICK_PERIOD));
    }

    pub fn pause_stopwatch(&mut self) {
        self.stopwatch = None;
    }

    pub fn stop_stopwatch(&mut self) {
        self.stopwatch = None;
    }

    pub fn reset_stopwatch(&mut self) {
        self.stopwatch = None;
        self.stopwatch_secs = 0;
    }

    /// Start the countdown from the typed number of seconds.
    pub fn start_timer(&mut self) {
        self.timer = None;
        match self.input.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                self.timer_secs = secs;
                self.message = None;
                self.timer = Some(Interval::start(self.now, TICK_PERIOD));
            }
            _ => {
                self.message = Some(INVALID_SECONDS.to_string());
            }
        }
    }

    /// Stop the countdown and silence the alarm.
    pub fn stop_timer(&mut self) {
        self.timer = None;
        self.alarm = false;
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::StartStopwatch => self.start_stopwatch(),
            Action::PauseStopwatch => self.pause_stopwatch(),
            Action::StopStopwatch => self.stop_stopwatch(),
            Action::ResetStopwatch => self.reset_stopwatch(),
            Action::StartTimer => self.start_timer(),
            Action::StopTimer => self.stop_timer(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let action = match key.code {
            KeyCode::Char('s') => Action::StartStopwatch,
            KeyCode::Char('p') => Action::PauseStopwatch,
            KeyCode::Char('x') => Action::StopStopwatch,
            KeyCode::Char('r') => Action::ResetStopwatch,
            KeyCode::Enter => Action::StartTimer,
            KeyCode::Char('a') | KeyCode::Esc => Action::StopTimer,
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.input.len() < MAX_INPUT_DIGITS {
                    self.input.push(c);
                }
                return true;
            }
            KeyCode::Backspace => {
                self.input.pop();
                return true;
            }
            _ => return false,
        };
        self.apply(action);
        true
    }

    fn render_stopwatch(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        if area.height == 0 {
            return;
        }
        let title = Style::default().add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::styled("Stopwatch", title),
            Line::from(self.stopwatch_display()),
        ];
        frame.render_widget(Paragraph::new(lines), area);
        let row = Rect::new(area.x, area.y.saturating_add(2), area.width, 1);
        if row.y < area.bottom() {
            self.stopwatch_buttons.render(
                frame,
                row,
                &[
                    ("Start", Action::StartStopwatch),
                    ("Pause", Action::PauseStopwatch),
                    ("Stop", Action::StopStopwatch),
                    ("Reset", Action::ResetStopwatch),
                ],
            );
        }
    }

    fn render_timer(&mut self, frame: &mut UiFrame<'_>, area: Rect, focused: bool) {
        if area.height == 0 {
            return;
        }
        let title = Style::default().add_modifier(Modifier::BOLD);
        let cursor = if focused { "_" } else { "" };
        let display = if self.alarm {
            Line::styled(
                format!("{}  ALARM!", self.timer_display()),
                Style::default()
                    .fg(crate::theme::alert_fg())
                    .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
            )
        } else {
            Line::from(self.timer_display())
        };
        let lines = vec![
            Line::styled("Timer", title),
            Line::from(format!("Seconds: {}{cursor}", self.input)),
            display,
        ];
        frame.render_widget(Paragraph::new(lines), area);
        let row = Rect::new(area.x, area.y.saturating_add(3), area.width, 1);
        if row.y < area.bottom() {
            self.timer_buttons.render(
                frame,
                row,
                &[("Start Timer", Action::StartTimer), ("Stop", Action::StopTimer)],
            );
        }
        let message_y = area.y.saturating_add(4);
        if let Some(message) = &self.message
            && message_y < area.bottom()
        {
            frame.render_widget(
                Paragraph::new(message.as_str()).style(Style::default().fg(crate::theme::alert_fg())),
                Rect::new(area.x, message_y, area.width, 1),
            );
        }
    }
}

impl HostedApp for TimerApp {
    fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.ctx.focus_self();
        }
    }

    fn dispose(&mut self) {
        self.stopwatch = None;
        self.timer = None;
        self.alarm = false;
    }

    fn handle_event(&mut self, event: &AppEvent) -> bool {
        match event {
            AppEvent::Activate {
                marker: Some(Marker::Close),
                ..
            } => {
                self.ctx.close_self();
                true
            }
            AppEvent::Activate { .. } => false,
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Click(at) => {
                let hit = self
                    .stopwatch_buttons
                    .hit(*at)
                    .or_else(|| self.timer_buttons.hit(*at));
                match hit {
                    Some(action) => {
                        self.apply(action);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        self.now = now;
        if let Some(interval) = &mut self.stopwatch {
            self.stopwatch_secs += u64::from(interval.elapsed(now));
        }
        let fired = self.timer.as_mut().map_or(0, |interval| interval.elapsed(now));
        for _ in 0..fired {
            if self.timer_secs > 0 {
                self.timer_secs -= 1;
            } else {
                self.timer = None;
                self.alarm = true;
                tracing::debug!(window = %self.ctx.frame, "countdown alarm");
                break;
            }
        }
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, sections: &SectionLayout, focused: bool) {
        self.render_stopwatch(frame, sections.get("stopwatch"));
        self.render_timer(frame, sections.get("timer"), focused);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{AppFactory, AppKind};
    use crate::store::KvStore;
    use crate::window::{SpawnCascade, WindowId, WindowRegistry};
    use crossterm::event::KeyModifiers;
    use std::time::Duration;

    fn app() -> (TimerApp, WindowRegistry) {
        let registry = WindowRegistry::new(AppFactory::new(), SpawnCascade::default());
        let factory = AppFactory::with_builtins(KvStore::in_memory());
        let ctx = AppContext {
            frame: WindowId::new(1),
            registry: registry.handle(),
            template: factory.template(&AppKind::TIMER).unwrap(),
            store: KvStore::in_memory(),
        };
        (TimerApp::new(ctx), registry)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn stopwatch_counts_and_resets() {
        let (mut app, _registry) = app();
        let t0 = app.now;
        app.start_stopwatch();
        app.tick(t0 + Duration::from_secs(3));
        assert_eq!(app.stopwatch_display(), "00:00:03");
        app.pause_stopwatch();
        app.tick(t0 + Duration::from_secs(10));
        assert_eq!(app.stopwatch_display(), "00:00:03");
        app.reset_stopwatch();
        assert_eq!(app.stopwatch_display(), "00:00:00");
        assert!(!app.ticking());
    }

    #[test]
    fn countdown_raises_alarm_one_tick_after_zero() {
        let (mut app, _registry) = app();
        let t0 = app.now;
        for c in ['2'] {
            app.handle_event(&key(KeyCode::Char(c)));
        }
        app.handle_event(&key(KeyCode::Enter));
        assert!(app.timer_running());
        app.tick(t0 + Duration::from_secs(2));
        assert_eq!(app.timer_display(), "00:00:00");
        assert!(!app.alarm());
        app.tick(t0 + Duration::from_secs(3));
        assert!(app.alarm());
        assert!(!app.timer_running());
        app.stop_timer();
        assert!(!app.alarm());
    }

    #[test]
    fn invalid_input_sets_message() {
        let (mut app, _registry) = app();
        app.set_input("0");
        app.start_timer();
        assert_eq!(app.message(), Some(INVALID_SECONDS));
        app.set_input("abc");
        app.start_timer();
        assert!(!app.timer_running());
        app.set_input("5");
        app.start_timer();
        assert_eq!(app.message(), None);
    }

    #[test]
    fn dispose_stops_all_clocks() {
        let (mut app, _registry) = app();
        app.start_stopwatch();
        app.set_input("9");
        app.start_timer();
        app.dispose();
        assert!(!app.ticking());
        app.dispose();
    }
}

//! Message chat over a pluggable transport.

use std::collections::VecDeque;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AppContext, AppEvent, ButtonRow, HostedApp};
use crate::ui::{UiFrame, safe_set_string};
use crate::view::{Marker, SectionLayout, ViewNode, ViewTemplate};
use crate::window::Size;

pub const USERNAME_KEY: &str = "chat.username";
pub const HISTORY_KEY: &str = "chat.history";
pub const DEFAULT_CHANNEL: &str = "my, not so secret, channel";
pub const EMOJIS: [&str; 4] = ["😀", "😂", "🤯", "💀"];

/// Sender name the relay uses for its own notices; never displayed.
const SERVER_USERNAME: &str = "Server";

pub fn template() -> ViewTemplate {
    ViewTemplate::new(Size::new(44, 16))
        .child(ViewNode::header([
            ViewNode::title("Chat"),
            ViewNode::close_button("x"),
        ]))
        .child(ViewNode::section("messages", Constraint::Min(4)))
        .child(ViewNode::section("input", Constraint::Length(2)))
        .child(ViewNode::section("actions", Constraint::Length(1)))
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transport is closed")]
    Closed,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Wire frame exchanged with the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: String,
    pub username: String,
    #[serde(default)]
    pub channel: String,
}

impl ChatMessage {
    pub fn text(username: &str, data: &str) -> Self {
        Self {
            kind: String::from("message"),
            data: data.to_string(),
            username: username.to_string(),
            channel: String::from(DEFAULT_CHANNEL),
        }
    }
}

/// One stored history line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub username: String,
    pub message: String,
}

pub trait ChatTransport: std::fmt::Debug {
    fn send(&mut self, message: &ChatMessage) -> Result<(), ChatError>;

    /// Drain frames that arrived since the last poll.
    fn poll(&mut self) -> Vec<ChatMessage>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Echoes every sent frame back as an inbound frame, the way the relay
/// broadcasts to all clients including the sender.
#[derive(Debug)]
pub struct LoopbackTransport {
    inbox: VecDeque<String>,
    open: bool,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self {
            inbox: VecDeque::new(),
            open: true,
        }
    }
}

impl LoopbackTransport {
    /// Queue a raw inbound frame.
    pub fn inject(&mut self, raw: impl Into<String>) {
        if self.open {
            self.inbox.push_back(raw.into());
        }
    }
}

impl ChatTransport for LoopbackTransport {
    fn send(&mut self, message: &ChatMessage) -> Result<(), ChatError> {
        if !self.open {
            return Err(ChatError::Closed);
        }
        let raw = serde_json::to_string(message)?;
        self.inbox.push_back(raw);
        Ok(())
    }

    fn poll(&mut self) -> Vec<ChatMessage> {
        self.inbox
            .drain(..)
            .filter_map(|raw| match serde_json::from_str(&raw) {
                Ok(message) => Some(message),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed chat frame");
                    None
                }
            })
            .collect()
    }

    fn close(&mut self) {
        self.open = false;
        self.inbox.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    SetUsername,
    ChangeUsername,
    ToggleEmoji,
    Emoji(usize),
    Send,
}

#[derive(Debug)]
pub struct ChatApp {
    ctx: AppContext,
    transport: Box<dyn ChatTransport>,
    shown: bool,
    username: String,
    editing_username: bool,
    username_input: String,
    message_input: String,
    picker_open: bool,
    picker_index: usize,
    lines: Vec<HistoryEntry>,
    buttons: ButtonRow<Action>,
}

impl ChatApp {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_transport(ctx, Box::new(LoopbackTransport::default()))
    }

    pub fn with_transport(ctx: AppContext, transport: Box<dyn ChatTransport>) -> Self {
        let username: String = ctx.store.get(USERNAME_KEY).unwrap_or_default();
        let lines: Vec<HistoryEntry> = ctx.store.get(HISTORY_KEY).unwrap_or_default();
        Self {
            ctx,
            transport,
            shown: false,
            editing_username: username.is_empty(),
            username_input: username.clone(),
            username,
            message_input: String::new(),
            picker_open: false,
            picker_index: 0,
            lines,
            buttons: ButtonRow::default(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_editing_username(&self) -> bool {
        self.editing_username
    }

    pub fn lines(&self) -> &[HistoryEntry] {
        &self.lines
    }

    pub fn message_input(&self) -> &str {
        &self.message_input
    }

    pub fn transport(&self) -> &dyn ChatTransport {
        self.transport.as_ref()
    }

    pub fn type_text(&mut self, text: &str) {
        if self.editing_username {
            self.username_input.push_str(text);
        } else {
            self.message_input.push_str(text);
        }
    }

    /// Adopt the typed username. Blank input keeps the prompt open.
    pub fn set_username(&mut self) {
        let username = self.username_input.trim().to_string();
        if username.is_empty() {
            return;
        }
        if let Err(err) = self.ctx.store.set(USERNAME_KEY, &username) {
            tracing::warn!(error = %err, "failed to store chat username");
        }
        self.username = username;
        self.editing_username = false;
    }

    pub fn change_username(&mut self) {
        self.editing_username = true;
        self.username_input = self.username.clone();
    }

    pub fn toggle_emoji_picker(&mut self) {
        self.picker_open = !self.picker_open;
    }

    pub fn insert_emoji(&mut self, index: usize) {
        if let Some(emoji) = EMOJIS.get(index) {
            self.message_input.push_str(emoji);
        }
        self.picker_open = false;
    }

    /// Send the typed message and record it in the history.
    pub fn send(&mut self) {
        let message = self.message_input.trim().to_string();
        if message.is_empty() || self.username.is_empty() {
            return;
        }
        if let Err(err) = self
            .transport
            .send(&ChatMessage::text(&self.username, &message))
        {
            tracing::warn!(window = %self.ctx.frame, error = %err, "chat send failed");
            return;
        }
        self.message_input.clear();
        self.save_history(HistoryEntry {
            username: self.username.clone(),
            message,
        });
    }

    /// Display inbound frames; frames from other users join the history.
    pub fn receive(&mut self) {
        for message in self.transport.poll() {
            if message.kind != "message" || message.username == SERVER_USERNAME {
                continue;
            }
            let entry = HistoryEntry {
                username: message.username,
                message: message.data,
            };
            if entry.username != self.username {
                self.save_history(entry.clone());
            }
            self.lines.push(entry);
        }
    }

    fn save_history(&self, entry: HistoryEntry) {
        let mut history: Vec<HistoryEntry> = self.ctx.store.get(HISTORY_KEY).unwrap_or_default();
        history.push(entry);
        if let Err(err) = self.ctx.store.set(HISTORY_KEY, &history) {
            tracing::warn!(error = %err, "failed to store chat history");
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::SetUsername => self.set_username(),
            Action::ChangeUsername => self.change_username(),
            Action::ToggleEmoji => self.toggle_emoji_picker(),
            Action::Emoji(index) => self.insert_emoji(index),
            Action::Send => self.send(),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if self.editing_username {
            match key.code {
                KeyCode::Enter => self.set_username(),
                KeyCode::Backspace => {
                    self.username_input.pop();
                }
                KeyCode::Esc if !self.username.is_empty() => self.editing_username = false,
                KeyCode::Char(c) => self.username_input.push(c),
                _ => return false,
            }
            return true;
        }
        if self.picker_open {
            match key.code {
                KeyCode::Left => self.picker_index = self.picker_index.saturating_sub(1),
                KeyCode::Right => self.picker_index = (self.picker_index + 1).min(EMOJIS.len() - 1),
                KeyCode::Enter => self.insert_emoji(self.picker_index),
                KeyCode::Esc => self.picker_open = false,
                _ => return false,
            }
            return true;
        }
        match key.code {
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.toggle_emoji_picker()
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.change_username()
            }
            KeyCode::Enter => self.send(),
            KeyCode::Backspace => {
                self.message_input.pop();
            }
            KeyCode::Char(c) => self.message_input.push(c),
            _ => return false,
        }
        true
    }

    fn render_messages(&self, frame: &mut UiFrame<'_>, area: Rect) {
        if area.height == 0 {
            return;
        }
        let visible = usize::from(area.height);
        let skip = self.lines.len().saturating_sub(visible);
        let lines: Vec<Line> = self.lines[skip..]
            .iter()
            .map(|entry| {
                let style = if entry.username == self.username {
                    Style::default().fg(crate::theme::accent())
                } else {
                    Style::default()
                };
                Line::styled(format!("{}: {}", entry.username, entry.message), style)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl HostedApp for ChatApp {
    fn show(&mut self) {
        if !self.shown {
            self.shown = true;
            self.ctx.focus_self();
        }
    }

    fn dispose(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
            tracing::debug!(window = %self.ctx.frame, "chat transport closed");
        }
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
            AppEvent::Click(at) => match self.buttons.hit(*at) {
                Some(action) => {
                    self.apply(action);
                    true
                }
                None => false,
            },
        }
    }

    fn tick(&mut self, _now: Instant) {
        self.receive();
    }

    fn render(&mut self, frame: &mut UiFrame<'_>, sections: &SectionLayout, focused: bool) {
        let cursor = if focused { "_" } else { "" };
        let input = sections.get("input");
        let actions = sections.get("actions");
        if self.editing_username {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from("Enter your username:"),
                    Line::from(format!("> {}{cursor}", self.username_input)),
                ]),
                sections.get("messages"),
            );
            self.buttons.render(frame, actions, &[("Chat", Action::SetUsername)]);
            return;
        }
        self.render_messages(frame, sections.get("messages"));
        if input.height > 0 {
            let text = format!("> {}{cursor}", self.message_input);
            safe_set_string(frame.buffer_mut(), input, input.x, input.y, &text, Style::default());
        }
        if self.picker_open {
            let items: Vec<(&str, Action)> = EMOJIS
                .iter()
                .enumerate()
                .map(|(idx, emoji)| (*emoji, Action::Emoji(idx)))
                .collect();
            self.buttons.render(frame, actions, &items);
            let marker_x = actions.x.saturating_add((self.picker_index as u16) * 5 + 1);
            if let Some(cell) = frame.buffer_mut().cell_mut((marker_x, actions.y)) {
                cell.set_style(Style::default().add_modifier(Modifier::REVERSED));
            }
        } else {
            self.buttons.render(
                frame,
                actions,
                &[
                    ("Send", Action::Send),
                    ("😊", Action::ToggleEmoji),
                    ("Change Username", Action::ChangeUsername),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::AppFactory;
    use crate::store::KvStore;
    use crate::window::{SpawnCascade, WindowId, WindowRegistry};

    fn app(store: KvStore) -> (ChatApp, WindowRegistry) {
        let registry = WindowRegistry::new(AppFactory::new(), SpawnCascade::default());
        let ctx = AppContext {
            frame: WindowId::new(1),
            registry: registry.handle(),
            template: template().validate().unwrap(),
            store,
        };
        (ChatApp::new(ctx), registry)
    }

    #[test]
    fn prompts_for_username_when_unknown() {
        let (mut app, _r) = app(KvStore::in_memory());
        assert!(app.is_editing_username());
        app.set_username();
        assert!(app.is_editing_username());
        app.type_text("  ada ");
        app.set_username();
        assert_eq!(app.username(), "ada");
        assert!(!app.is_editing_username());
    }

    #[test]
    fn sent_message_echoes_and_is_saved_once() {
        let store = KvStore::in_memory();
        store.set(USERNAME_KEY, &"ada").unwrap();
        let (mut app, _r) = app(store.clone());
        app.type_text("hello");
        app.send();
        assert_eq!(app.message_input(), "");
        app.receive();
        assert_eq!(app.lines().len(), 1);
        let history: Vec<HistoryEntry> = store.get(HISTORY_KEY).unwrap();
        assert_eq!(
            history,
            vec![HistoryEntry {
                username: String::from("ada"),
                message: String::from("hello"),
            }]
        );
    }

    #[test]
    fn server_and_malformed_frames_are_skipped() {
        let store = KvStore::in_memory();
        store.set(USERNAME_KEY, &"ada").unwrap();
        let mut transport = LoopbackTransport::default();
        transport.inject(r#"{"type":"message","data":"hi","username":"Server"}"#);
        transport.inject("not json");
        transport.inject(r#"{"type":"heartbeat","data":"","username":"x"}"#);
        transport.inject(r#"{"type":"message","data":"yo","username":"bob"}"#);
        let registry = WindowRegistry::new(AppFactory::new(), SpawnCascade::default());
        let ctx = AppContext {
            frame: WindowId::new(1),
            registry: registry.handle(),
            template: template().validate().unwrap(),
            store: store.clone(),
        };
        let mut app = ChatApp::with_transport(ctx, Box::new(transport));
        app.receive();
        assert_eq!(app.lines().len(), 1);
        assert_eq!(app.lines()[0].username, "bob");
        assert_eq!(store.get::<Vec<HistoryEntry>>(HISTORY_KEY).unwrap().len(), 1);
    }

    #[test]
    fn history_is_loaded_on_open() {
        let store = KvStore::in_memory();
        store
            .set(
                HISTORY_KEY,
                &vec![HistoryEntry {
                    username: String::from("bob"),
                    message: String::from("earlier"),
                }],
            )
            .unwrap();
        let (app, _r) = app(store);
        assert_eq!(app.lines()[0].message, "earlier");
    }

    #[test]
    fn emoji_is_appended_and_picker_closes() {
        let store = KvStore::in_memory();
        store.set(USERNAME_KEY, &"ada").unwrap();
        let (mut app, _r) = app(store);
        app.type_text("hi ");
        app.toggle_emoji_picker();
        app.insert_emoji(1);
        assert_eq!(app.message_input(), "hi 😂");
        assert!(!app.picker_open);
    }

    #[test]
    fn dispose_closes_transport() {
        let (mut app, _r) = app(KvStore::in_memory());
        app.dispose();
        assert!(!app.transport().is_open());
        app.dispose();
    }
}

//! Hosted applications and the factory that builds them.
//!
//! The window manager only knows the [`HostedApp`] capability contract.
//! Each app kind pairs a [`ViewTemplate`] with a constructor; the factory
//! validates the template before the constructor runs, so a broken
//! pairing never yields a half-built window.

pub mod chat;
pub mod clock;
pub mod memory;
pub mod quiz;
pub mod quiz_http;
pub mod timer;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;

pub use chat::ChatApp;
pub use memory::MemoryApp;
pub use quiz::QuizApp;
pub use timer::TimerApp;

use crate::error::{WmError, WmResult};
use crate::store::KvStore;
use crate::ui::{UiFrame, safe_set_string};
use crate::view::{AffordanceId, Marker, SectionLayout, ValidatedTemplate, ViewTemplate};
use crate::window::{Point, RegistryHandle, WindowId};

/// Tag naming which hosted application occupies a window.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppKind(Cow<'static, str>);

impl AppKind {
    pub const QUIZ: AppKind = AppKind(Cow::Borrowed("quiz"));
    pub const MEMORY: AppKind = AppKind(Cow::Borrowed("memory"));
    pub const CHAT: AppKind = AppKind(Cow::Borrowed("chat"));
    pub const TIMER: AppKind = AppKind(Cow::Borrowed("timer"));

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppKind {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for AppKind {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<&AppKind> for AppKind {
    fn from(value: &AppKind) -> Self {
        value.clone()
    }
}

impl FromStr for AppKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Input delivered to a hosted app by its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Pointer-down inside the content region, in frame-local cells.
    Click(Point),
    /// Pointer-down on a header button of the app's template.
    Activate {
        affordance: AffordanceId,
        marker: Option<Marker>,
    },
}

/// Capability contract every hosted application implements.
pub trait HostedApp: fmt::Debug {
    /// Make the content visible and request the initial focus event.
    /// Calling it again has no further effect.
    fn show(&mut self);

    /// Cancel every timer, transport and subscription the app owns.
    /// Safe to call on an already disposed app.
    fn dispose(&mut self);

    fn handle_event(&mut self, _event: &AppEvent) -> bool {
        false
    }

    /// Advance app-owned timers to `now`.
    fn tick(&mut self, _now: Instant) {}

    fn render(&mut self, frame: &mut UiFrame<'_>, sections: &SectionLayout, focused: bool);
}

/// What an app receives at construction.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub frame: WindowId,
    pub registry: RegistryHandle,
    pub template: ValidatedTemplate,
    pub store: KvStore,
}

impl AppContext {
    /// Request the window's own closing.
    pub fn close_self(&self) {
        self.registry.request_close(self.frame);
    }

    pub fn focus_self(&self) {
        self.registry.request_focus(self.frame);
    }
}

type TemplateFn = Box<dyn Fn() -> ViewTemplate>;
type ConstructFn = Box<dyn Fn(AppContext) -> Box<dyn HostedApp>>;

/// Template and constructor for one app kind.
pub struct AppEntry {
    template: TemplateFn,
    construct: ConstructFn,
}

impl AppEntry {
    pub fn new<T, C>(template: T, construct: C) -> Self
    where
        T: Fn() -> ViewTemplate + 'static,
        C: Fn(AppContext) -> Box<dyn HostedApp> + 'static,
    {
        Self {
            template: Box::new(template),
            construct: Box::new(construct),
        }
    }
}

/// A constructed app together with the template its frame is built from.
#[derive(Debug)]
pub struct Instance {
    pub template: ValidatedTemplate,
    pub app: Box<dyn HostedApp>,
}

pub struct AppFactory {
    entries: BTreeMap<AppKind, AppEntry>,
    store: KvStore,
}

impl fmt::Debug for AppFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppFactory")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for AppFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AppFactory {
    /// An empty factory backed by an in-memory store.
    pub fn new() -> Self {
        Self::with_store(KvStore::in_memory())
    }

    pub fn with_store(store: KvStore) -> Self {
        Self {
            entries: BTreeMap::new(),
            store,
        }
    }

    /// Factory with the quiz, memory, chat and timer apps registered.
    pub fn with_builtins(store: KvStore) -> Self {
        let mut factory = Self::with_store(store);
        factory.register(
            AppKind::QUIZ,
            AppEntry::new(quiz::template, |ctx| Box::new(QuizApp::new(ctx))),
        );
        factory.register(
            AppKind::MEMORY,
            AppEntry::new(memory::template, |ctx| Box::new(MemoryApp::new(ctx))),
        );
        factory.register(
            AppKind::CHAT,
            AppEntry::new(chat::template, |ctx| Box::new(ChatApp::new(ctx))),
        );
        factory.register(
            AppKind::TIMER,
            AppEntry::new(timer::template, |ctx| Box::new(TimerApp::new(ctx))),
        );
        factory
    }

    /// Register `entry` for `kind`, returning the entry it replaced.
    pub fn register(&mut self, kind: AppKind, entry: AppEntry) -> Option<AppEntry> {
        self.entries.insert(kind, entry)
    }

    pub fn contains(&self, kind: &AppKind) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &AppKind> {
        self.entries.keys()
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Resolve and validate the template for `kind`.
    pub fn template(&self, kind: &AppKind) -> WmResult<ValidatedTemplate> {
        let entry = self
            .entries
            .get(kind)
            .ok_or_else(|| WmError::UnknownKind(kind.clone()))?;
        (entry.template)()
            .validate()
            .map_err(|source| WmError::Template {
                kind: kind.clone(),
                source,
            })
    }

    /// Build the app for `kind` bound to `frame`.
    pub fn instantiate(
        &self,
        kind: &AppKind,
        frame: WindowId,
        registry: RegistryHandle,
    ) -> WmResult<Instance> {
        let template = self.template(kind)?;
        let entry = self
            .entries
            .get(kind)
            .ok_or_else(|| WmError::UnknownKind(kind.clone()))?;
        let app = (entry.construct)(AppContext {
            frame,
            registry,
            template: template.clone(),
            store: self.store.clone(),
        });
        Ok(Instance { template, app })
    }
}

/// Clickable `[label]` buttons laid out on one row.
#[derive(Debug)]
pub(crate) struct ButtonRow<A> {
    hits: Vec<(Rect, A)>,
}

impl<A: Copy> Default for ButtonRow<A> {
    fn default() -> Self {
        Self { hits: Vec::new() }
    }
}

impl<A: Copy> ButtonRow<A> {
    /// Draw `items` left to right on the first row of `area`, replacing the
    /// hit regions recorded by the previous call.
    pub(crate) fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect, items: &[(&str, A)]) {
        self.hits.clear();
        if area.width == 0 || area.height == 0 {
            return;
        }
        let style = Style::default().fg(crate::theme::button_fg());
        let mut x = area.x;
        for (label, action) in items {
            let text = format!("[{label}]");
            let width = Span::raw(text.as_str()).width() as u16;
            if x.saturating_add(width) > area.right() {
                break;
            }
            safe_set_string(frame.buffer_mut(), area, x, area.y, &text, style);
            self.hits.push((Rect::new(x, area.y, width, 1), *action));
            x = x.saturating_add(width + 1);
        }
    }

    pub(crate) fn hit(&self, at: Point) -> Option<A> {
        let (Ok(x), Ok(y)) = (u16::try_from(at.x), u16::try_from(at.y)) else {
            return None;
        };
        self.hits
            .iter()
            .find(|(rect, _)| rect.contains((x, y).into()))
            .map(|(_, action)| *action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowRegistry;

    #[test]
    fn builtin_templates_validate() {
        let factory = AppFactory::with_builtins(KvStore::in_memory());
        for kind in [AppKind::QUIZ, AppKind::MEMORY, AppKind::CHAT, AppKind::TIMER] {
            let template = factory.template(&kind).unwrap();
            assert!(template.affordance(Marker::Close).is_some(), "{kind}");
        }
    }

    #[test]
    fn unknown_kind_is_reported() {
        let factory = AppFactory::with_builtins(KvStore::in_memory());
        let registry = WindowRegistry::new(AppFactory::new(), Default::default());
        let err = factory
            .instantiate(&AppKind::from("paint"), WindowId::new(1), registry.handle())
            .unwrap_err();
        assert_eq!(err, WmError::UnknownKind(AppKind::from("paint")));
    }

    #[test]
    fn kinds_compare_by_name() {
        assert_eq!(AppKind::from("quiz"), AppKind::QUIZ);
        assert_eq!("timer".parse::<AppKind>().unwrap(), AppKind::TIMER);
    }

    #[test]
    fn button_row_records_hits() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buffer = ratatui::buffer::Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buffer);
        let mut row = ButtonRow::default();
        row.render(&mut frame, area, &[("Go", 1u8), ("Stop", 2u8)]);
        assert_eq!(row.hit(Point::new(1, 0)), Some(1));
        assert_eq!(row.hit(Point::new(6, 0)), Some(2));
        assert_eq!(row.hit(Point::new(4, 0)), None);
        assert_eq!(row.hit(Point::new(-1, 0)), None);
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::prelude::Rect;

use super::decorator::{DefaultDecorator, WindowDecorator};
use super::{Frame, FrameHit, Point, PointerEvent, PointerId, PointerKind, Position, Size, WindowId};
use crate::apps::{AppEvent, AppFactory, AppKind, HostedApp};
use crate::constants::{DEFAULT_SPAWN_ORIGIN, DEFAULT_SPAWN_STEP};
use crate::error::WmResult;
use crate::stacking::StackingAuthority;
use crate::ui::UiFrame;
use crate::view::ValidatedTemplate;

/// Deterministic stagger applied to newly opened windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnCascade {
    pub origin: Position,
    pub step: i32,
}

impl Default for SpawnCascade {
    fn default() -> Self {
        Self {
            origin: DEFAULT_SPAWN_ORIGIN,
            step: DEFAULT_SPAWN_STEP,
        }
    }
}

impl SpawnCascade {
    pub const fn new(origin: Position, step: i32) -> Self {
        Self { origin, step }
    }

    /// Spawn position when `open_windows` windows are already open.
    pub fn position_for(&self, open_windows: usize) -> Position {
        let count = i32::try_from(open_windows).unwrap_or(i32::MAX);
        let shift = self.step.saturating_mul(count);
        self.origin.offset(shift, shift)
    }
}

/// Requests hosted apps send back to the registry that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Close(WindowId),
    Focus(WindowId),
}

/// Cloneable handle given to hosted apps. Requests are applied by the
/// registry synchronously after the dispatch that produced them.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: Sender<WindowRequest>,
}

impl RegistryHandle {
    pub fn request_close(&self, id: WindowId) {
        // A dropped registry has nothing left to close.
        let _ = self.tx.send(WindowRequest::Close(id));
    }

    pub fn request_focus(&self, id: WindowId) {
        let _ = self.tx.send(WindowRequest::Focus(id));
    }
}

/// One open window: its frame, the app it hosts and the template it was
/// built from.
#[derive(Debug)]
pub struct WindowRecord {
    kind: AppKind,
    frame: Frame,
    template: ValidatedTemplate,
    app: Box<dyn HostedApp>,
}

impl WindowRecord {
    pub fn id(&self) -> WindowId {
        self.frame.id()
    }

    pub fn kind(&self) -> &AppKind {
        &self.kind
    }

    pub fn position(&self) -> Position {
        self.frame.position()
    }

    pub fn z_index(&self) -> u64 {
        self.frame.z_index()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn template(&self) -> &ValidatedTemplate {
        &self.template
    }

    pub fn app(&self) -> &dyn HostedApp {
        self.app.as_ref()
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            id: self.id(),
            kind: self.kind.clone(),
            position: self.position(),
            size: self.frame.size(),
            z_index: self.z_index(),
        }
    }
}

/// Read-only view of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub kind: AppKind,
    pub position: Position,
    pub size: Size,
    pub z_index: u64,
}

pub struct WindowRegistry {
    records: Vec<WindowRecord>,
    next_id: u64,
    stacking: StackingAuthority,
    cascade: SpawnCascade,
    factory: AppFactory,
    // Pointer subscriptions of in-flight drags; removed on pointer-up.
    sessions: BTreeMap<PointerId, WindowId>,
    requests_tx: Sender<WindowRequest>,
    requests_rx: Receiver<WindowRequest>,
    decorator: Arc<dyn WindowDecorator>,
}

impl std::fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("records", &self.records)
            .field("next_id", &self.next_id)
            .field("stacking", &self.stacking)
            .field("cascade", &self.cascade)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl WindowRegistry {
    pub fn new(factory: AppFactory, cascade: SpawnCascade) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel();
        Self {
            records: Vec::new(),
            next_id: 1,
            stacking: StackingAuthority::new(),
            cascade,
            factory,
            sessions: BTreeMap::new(),
            requests_tx,
            requests_rx,
            decorator: Arc::new(DefaultDecorator),
        }
    }

    pub fn set_decorator(&mut self, decorator: Arc<dyn WindowDecorator>) {
        self.decorator = decorator;
    }

    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            tx: self.requests_tx.clone(),
        }
    }

    pub fn stacking(&self) -> &StackingAuthority {
        &self.stacking
    }

    pub fn factory(&self) -> &AppFactory {
        &self.factory
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn records(&self) -> impl Iterator<Item = &WindowRecord> {
        self.records.iter()
    }

    /// Snapshot of all open windows in insertion order.
    pub fn list(&self) -> Vec<WindowSnapshot> {
        self.records.iter().map(WindowRecord::snapshot).collect()
    }

    fn index_of(&self, id: WindowId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    fn record_mut(&mut self, id: WindowId) -> Option<&mut WindowRecord> {
        self.records.iter_mut().find(|record| record.id() == id)
    }

    /// Open a window hosting `kind`. Unknown kinds and broken templates are
    /// reported without registering anything or consuming an id.
    pub fn open(&mut self, kind: impl Into<AppKind>) -> WmResult<WindowId> {
        let kind = kind.into();
        let id = WindowId::new(self.next_id);
        let instance = self
            .factory
            .instantiate(&kind, id, self.handle())
            .inspect_err(|err| tracing::warn!(%kind, error = %err, "open rejected"))?;
        self.next_id += 1;
        let position = self.cascade.position_for(self.records.len());
        let frame = Frame::new(id, position, &instance.template, self.stacking.clone());
        self.records.push(WindowRecord {
            kind: kind.clone(),
            frame,
            template: instance.template,
            app: instance.app,
        });
        tracing::info!(window = %id, %kind, top = position.top, left = position.left, "opened window");
        if let Some(record) = self.records.last_mut() {
            record.app.show();
        }
        self.drain_requests();
        Ok(id)
    }

    /// Dispose the hosted app and drop the window. Unknown ids are ignored.
    pub fn close(&mut self, id: WindowId) -> bool {
        let Some(index) = self.index_of(id) else {
            tracing::debug!(window = %id, "close ignored for unknown window");
            return false;
        };
        self.records[index].app.dispose();
        self.records[index].frame.cancel_drag();
        self.sessions.retain(|_, window| *window != id);
        let record = self.records.remove(index);
        tracing::info!(window = %id, kind = %record.kind, "closed window");
        true
    }

    /// Raise `id` above every other window.
    pub fn focus(&mut self, id: WindowId) -> Option<u64> {
        self.record_mut(id).map(|record| record.frame.focus())
    }

    /// The window with the highest z-index.
    ///
    /// Closing the focused window does not raise another one; the next
    /// highest simply becomes the answer here.
    pub fn focused(&self) -> Option<WindowId> {
        self.records
            .iter()
            .max_by_key(|record| record.z_index())
            .map(WindowRecord::id)
    }

    fn topmost_at(&self, at: Point) -> Option<(WindowId, FrameHit)> {
        self.records
            .iter()
            .filter_map(|record| record.frame.hit_test(at).map(|hit| (record, hit)))
            .max_by_key(|(record, _)| record.z_index())
            .map(|(record, hit)| (record.id(), hit))
    }

    /// Route one pointer transition. Returns whether a window consumed it.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down => self.pointer_down(event.pointer, event.at),
            PointerKind::Move => {
                let Some(id) = self.sessions.get(&event.pointer).copied() else {
                    return false;
                };
                self.record_mut(id)
                    .is_some_and(|record| record.frame.drag_to(event.pointer, event.at))
            }
            PointerKind::Up => self.end_session(event.pointer),
        }
    }

    fn pointer_down(&mut self, pointer: PointerId, at: Point) -> bool {
        // A down without a matching up ends the stale session first.
        self.end_session(pointer);
        let Some((id, hit)) = self.topmost_at(at) else {
            return false;
        };
        let Some(record) = self.record_mut(id) else {
            return false;
        };
        record.frame.focus();
        match hit {
            FrameHit::Header => {
                if record.frame.begin_drag(pointer, at) {
                    self.sessions.insert(pointer, id);
                }
            }
            FrameHit::Affordance(affordance, marker) => {
                record
                    .app
                    .handle_event(&AppEvent::Activate { affordance, marker });
            }
            FrameHit::Content(local) => {
                record.app.handle_event(&AppEvent::Click(local));
            }
        }
        self.drain_requests();
        true
    }

    fn end_session(&mut self, pointer: PointerId) -> bool {
        let Some(id) = self.sessions.remove(&pointer) else {
            return false;
        };
        if let Some(record) = self.record_mut(id) {
            record.frame.end_drag(pointer);
        }
        true
    }

    /// Deliver a key press to the focused window.
    pub fn key(&mut self, key: KeyEvent) -> bool {
        let Some(id) = self.focused() else {
            return false;
        };
        let handled = self
            .record_mut(id)
            .is_some_and(|record| record.app.handle_event(&AppEvent::Key(key)));
        self.drain_requests();
        handled
    }

    /// Advance every hosted app's timers.
    pub fn tick(&mut self, now: Instant) {
        for record in &mut self.records {
            record.app.tick(now);
        }
        self.drain_requests();
    }

    /// Apply pending close/focus requests from hosted apps.
    pub fn drain_requests(&mut self) {
        while let Ok(request) = self.requests_rx.try_recv() {
            match request {
                WindowRequest::Close(id) => {
                    self.close(id);
                }
                WindowRequest::Focus(id) => {
                    self.focus(id);
                }
            }
        }
    }

    /// Draw every window bottom to top.
    pub fn render(&mut self, ui: &mut UiFrame<'_>) {
        let focused = self.focused();
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by_key(|&idx| self.records[idx].z_index());
        for idx in order {
            let record = &mut self.records[idx];
            let rect = record.frame.rect();
            if rect.visible_in(ui.area()).is_empty() {
                continue;
            }
            let is_focused = focused == Some(record.id());
            let area = Rect::new(0, 0, rect.width, rect.height);
            let mut buffer = Buffer::empty(area);
            self.decorator
                .render_window(&mut buffer, record.frame.chrome(), is_focused);
            let content = Rect::new(
                1,
                1,
                rect.width.saturating_sub(2),
                rect.height.saturating_sub(2),
            );
            let sections = record.template.layout_sections(content);
            {
                let mut sub = UiFrame::from_parts(area, &mut buffer);
                record.app.render(&mut sub, &sections, is_focused);
            }
            ui.blit_from_signed(&buffer, rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{AppContext, AppEntry};
    use crate::view::{AffordanceId, Marker, SectionLayout, ViewNode, ViewTemplate};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Calls {
        shown: usize,
        disposed: usize,
        clicks: Vec<Point>,
    }

    #[derive(Debug)]
    struct SpyApp {
        ctx: AppContext,
        close: Option<AffordanceId>,
        calls: Rc<RefCell<Calls>>,
    }

    impl HostedApp for SpyApp {
        fn show(&mut self) {
            let mut calls = self.calls.borrow_mut();
            if calls.shown == 0 {
                self.ctx.registry.request_focus(self.ctx.frame);
            }
            calls.shown += 1;
        }

        fn dispose(&mut self) {
            self.calls.borrow_mut().disposed += 1;
        }

        fn handle_event(&mut self, event: &AppEvent) -> bool {
            match event {
                AppEvent::Activate { affordance, .. } if Some(*affordance) == self.close => {
                    self.ctx.registry.request_close(self.ctx.frame);
                    true
                }
                AppEvent::Click(at) => {
                    self.calls.borrow_mut().clicks.push(*at);
                    true
                }
                _ => false,
            }
        }

        fn render(&mut self, _frame: &mut UiFrame<'_>, _sections: &SectionLayout, _focused: bool) {}
    }

    fn spy_registry() -> (WindowRegistry, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let shared = calls.clone();
        let mut factory = AppFactory::new();
        factory.register(
            AppKind::from("spy"),
            AppEntry::new(
                || {
                    ViewTemplate::new(Size::new(10, 5))
                        .child(ViewNode::header([ViewNode::close_button("X")]))
                },
                move |ctx| {
                    let close = ctx.template.affordance(Marker::Close);
                    Box::new(SpyApp {
                        ctx,
                        close,
                        calls: shared.clone(),
                    })
                },
            ),
        );
        factory.register(
            AppKind::from("broken"),
            AppEntry::new(
                || ViewTemplate::new(Size::new(10, 5)).child(ViewNode::title("no header")),
                |_| unreachable!("broken template must not construct"),
            ),
        );
        let registry = WindowRegistry::new(factory, SpawnCascade::new(Position::new(0, 0), 3));
        (registry, calls)
    }

    #[test]
    fn open_shows_app_and_focuses_it() {
        let (mut registry, calls) = spy_registry();
        let id = registry.open("spy").unwrap();
        assert_eq!(calls.borrow().shown, 1);
        assert_eq!(registry.get(id).unwrap().z_index(), 1);
        assert_eq!(registry.focused(), Some(id));
    }

    #[test]
    fn broken_template_registers_nothing() {
        let (mut registry, _) = spy_registry();
        let err = registry.open("broken").unwrap_err();
        assert!(matches!(err, crate::error::WmError::Template { .. }));
        assert!(registry.is_empty());
        let id = registry.open("spy").unwrap();
        assert_eq!(id, WindowId::new(1));
    }

    #[test]
    fn close_affordance_click_disposes_and_removes() {
        let (mut registry, calls) = spy_registry();
        let id = registry.open("spy").unwrap();
        let slot = registry.get(id).unwrap().frame().chrome().slots[0].clone();
        assert!(registry.pointer(PointerEvent::down(slot.offset as i32 + 1, 0)));
        assert_eq!(calls.borrow().disposed, 1);
        assert!(!registry.contains(id));
    }

    #[test]
    fn content_clicks_are_frame_local() {
        let (mut registry, calls) = spy_registry();
        registry.open("spy").unwrap();
        registry.open("spy").unwrap();
        // second window spawns at (3, 3); (5, 6) lands in its content
        registry.pointer(PointerEvent::down(5, 6));
        assert_eq!(calls.borrow().clicks, vec![Point::new(2, 3)]);
    }

    #[test]
    fn header_drag_subscribes_until_pointer_up() {
        let (mut registry, _) = spy_registry();
        let id = registry.open("spy").unwrap();
        registry.pointer(PointerEvent::down(2, 0));
        assert_eq!(registry.sessions.get(&PointerId::PRIMARY), Some(&id));
        registry.pointer(PointerEvent::moved(6, 4));
        registry.pointer(PointerEvent::up(100, 100));
        assert!(registry.sessions.is_empty());
        assert_eq!(registry.get(id).unwrap().position(), Position::new(4, 4));
        assert!(!registry.pointer(PointerEvent::moved(50, 50)));
        assert_eq!(registry.get(id).unwrap().position(), Position::new(4, 4));
    }

    #[test]
    fn closing_mid_drag_drops_the_subscription() {
        let (mut registry, _) = spy_registry();
        let id = registry.open("spy").unwrap();
        registry.pointer(PointerEvent::down(2, 0));
        registry.close(id);
        assert!(registry.sessions.is_empty());
        assert!(!registry.pointer(PointerEvent::moved(9, 9)));
    }

    #[test]
    fn cascade_saturates_for_huge_counts() {
        let cascade = SpawnCascade::new(Position::new(0, 0), i32::MAX);
        assert_eq!(cascade.position_for(3), Position::new(i32::MAX, i32::MAX));
    }
}

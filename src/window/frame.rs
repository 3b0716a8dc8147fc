//! The draggable, closable shell around one hosted app.

use super::decorator::Chrome;
use super::{FloatRect, Point, PointerId, Position, Size, WindowId};
use crate::stacking::StackingAuthority;
use crate::view::{AffordanceId, Marker, ValidatedTemplate};

/// State captured when a header drag begins. Each session owns its own
/// start coordinates, so sessions on different frames never interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub pointer: PointerId,
    pub start_pointer: Point,
    pub start_position: Position,
}

impl DragSession {
    /// Position for the pointer at `at`: start position plus pointer delta.
    pub fn position_at(&self, at: Point) -> Position {
        let (dx, dy) = at.delta_from(self.start_pointer);
        self.start_position.offset(dx, dy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Which part of a frame a point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHit {
    Header,
    Affordance(AffordanceId, Option<Marker>),
    /// Frame-local coordinates (0, 0 is the top-left chrome cell).
    Content(Point),
}

#[derive(Debug)]
pub struct Frame {
    id: WindowId,
    position: Position,
    size: Size,
    z_index: u64,
    drag: DragState,
    chrome: Chrome,
    stacking: StackingAuthority,
}

impl Frame {
    pub fn new(
        id: WindowId,
        position: Position,
        template: &ValidatedTemplate,
        stacking: StackingAuthority,
    ) -> Self {
        Self {
            id,
            position,
            size: template.size(),
            z_index: 0,
            drag: DragState::Idle,
            chrome: Chrome::from_template(template),
            stacking,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn z_index(&self) -> u64 {
        self.z_index
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    pub fn chrome(&self) -> &Chrome {
        &self.chrome
    }

    pub fn rect(&self) -> FloatRect {
        FloatRect {
            x: self.position.left,
            y: self.position.top,
            width: self.size.width,
            height: self.size.height,
        }
    }

    /// Take the next value from the stacking authority.
    pub fn focus(&mut self) -> u64 {
        self.z_index = self.stacking.raise();
        tracing::debug!(window = %self.id, z_index = self.z_index, "focused window");
        self.z_index
    }

    pub fn hit_test(&self, at: Point) -> Option<FrameHit> {
        if !self.rect().contains(at) {
            return None;
        }
        let (dx, dy) = at.delta_from(Point::new(self.position.left, self.position.top));
        let local = Point::new(dx, dy);
        if local.y == 0 {
            if let Some(slot) = self.chrome.slot_at(local.x as u16) {
                return Some(FrameHit::Affordance(slot.id, slot.marker));
            }
            return Some(FrameHit::Header);
        }
        Some(FrameHit::Content(local))
    }

    /// Enter `Dragging` for `pointer`. A frame already dragged by another
    /// pointer keeps its session.
    pub fn begin_drag(&mut self, pointer: PointerId, at: Point) -> bool {
        if let DragState::Dragging(session) = self.drag
            && session.pointer != pointer
        {
            return false;
        }
        self.drag = DragState::Dragging(DragSession {
            pointer,
            start_pointer: at,
            start_position: self.position,
        });
        tracing::debug!(window = %self.id, x = at.x, y = at.y, "drag started");
        true
    }

    /// Apply one pointer move. Returns whether the position was updated.
    pub fn drag_to(&mut self, pointer: PointerId, at: Point) -> bool {
        match self.drag {
            DragState::Dragging(session) if session.pointer == pointer => {
                self.position = session.position_at(at);
                true
            }
            _ => false,
        }
    }

    /// Leave `Dragging` if `pointer` owns the session.
    pub fn end_drag(&mut self, pointer: PointerId) -> bool {
        match self.drag {
            DragState::Dragging(session) if session.pointer == pointer => {
                self.drag = DragState::Idle;
                tracing::debug!(window = %self.id, top = self.position.top, left = self.position.left, "drag ended");
                true
            }
            _ => false,
        }
    }

    /// Drop any in-flight session without moving the frame.
    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ViewNode, ViewTemplate};

    fn template() -> ValidatedTemplate {
        ViewTemplate::new(Size::new(12, 6))
            .child(ViewNode::header([
                ViewNode::title("T"),
                ViewNode::close_button("X"),
            ]))
            .validate()
            .unwrap()
    }

    fn frame(id: u64, position: Position, stacking: &StackingAuthority) -> Frame {
        Frame::new(WindowId::new(id), position, &template(), stacking.clone())
    }

    #[test]
    fn drag_moves_by_pointer_delta() {
        let stacking = StackingAuthority::new();
        let mut f = frame(1, Position::new(50, 50), &stacking);
        assert!(f.begin_drag(PointerId::PRIMARY, Point::new(100, 100)));
        assert!(f.drag_to(PointerId::PRIMARY, Point::new(140, 130)));
        assert!(f.end_drag(PointerId::PRIMARY));
        assert_eq!(f.position(), Position::new(80, 90));
        assert_eq!(f.drag_state(), DragState::Idle);
    }

    #[test]
    fn drag_is_not_clamped() {
        let stacking = StackingAuthority::new();
        let mut f = frame(1, Position::new(2, 2), &stacking);
        f.begin_drag(PointerId::PRIMARY, Point::new(5, 5));
        f.drag_to(PointerId::PRIMARY, Point::new(-40, -20));
        assert_eq!(f.position(), Position::new(-23, -43));
    }

    #[test]
    fn moves_without_session_are_ignored() {
        let stacking = StackingAuthority::new();
        let mut f = frame(1, Position::new(0, 0), &stacking);
        assert!(!f.drag_to(PointerId::PRIMARY, Point::new(9, 9)));
        assert!(!f.end_drag(PointerId::PRIMARY));
        assert_eq!(f.position(), Position::new(0, 0));
    }

    #[test]
    fn concurrent_sessions_stay_isolated() {
        let stacking = StackingAuthority::new();
        let mut a = frame(1, Position::new(10, 10), &stacking);
        let mut b = frame(2, Position::new(40, 40), &stacking);
        let pa = PointerId(0);
        let pb = PointerId(1);
        a.begin_drag(pa, Point::new(100, 100));
        a.drag_to(pa, Point::new(110, 105));
        b.begin_drag(pb, Point::new(0, 0));
        b.drag_to(pb, Point::new(-7, 3));
        a.drag_to(pa, Point::new(140, 130));
        b.end_drag(pb);
        a.end_drag(pa);
        assert_eq!(a.position(), Position::new(40, 50));
        assert_eq!(b.position(), Position::new(43, 33));
    }

    #[test]
    fn foreign_pointer_cannot_steal_session() {
        let stacking = StackingAuthority::new();
        let mut f = frame(1, Position::new(0, 0), &stacking);
        f.begin_drag(PointerId(0), Point::new(0, 0));
        assert!(!f.begin_drag(PointerId(1), Point::new(5, 5)));
        assert!(!f.drag_to(PointerId(1), Point::new(9, 9)));
        assert!(!f.end_drag(PointerId(1)));
        assert!(f.is_dragging());
    }

    #[test]
    fn focus_takes_next_stacking_value() {
        let stacking = StackingAuthority::new();
        let mut a = frame(1, Position::default(), &stacking);
        let mut b = frame(2, Position::default(), &stacking);
        a.focus();
        b.focus();
        a.focus();
        assert!(a.z_index() > b.z_index());
        assert_eq!(a.z_index(), stacking.current());
    }

    #[test]
    fn hit_test_distinguishes_regions() {
        let stacking = StackingAuthority::new();
        let f = frame(1, Position::new(5, 10), &stacking);
        assert_eq!(f.hit_test(Point::new(11, 5)), Some(FrameHit::Header));
        let close = f.chrome().slots[0].offset as i32;
        assert_eq!(
            f.hit_test(Point::new(10 + close + 1, 5)),
            Some(FrameHit::Affordance(AffordanceId(0), Some(Marker::Close)))
        );
        assert_eq!(
            f.hit_test(Point::new(13, 8)),
            Some(FrameHit::Content(Point::new(3, 3)))
        );
        assert_eq!(f.hit_test(Point::new(9, 5)), None);
        assert_eq!(f.hit_test(Point::new(10, 11)), None);
    }
}

pub mod decorator;

mod frame;
mod registry;

use std::fmt;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::Rect;

pub use frame::{DragSession, DragState, Frame, FrameHit};
pub use registry::{
    RegistryHandle, SpawnCascade, WindowRecord, WindowRegistry, WindowRequest, WindowSnapshot,
};

/// Identity of one window, unique for the lifetime of its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Top-left corner of a frame in layout cells. May be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub top: i32,
    pub left: i32,
}

impl Position {
    pub const fn new(top: i32, left: i32) -> Self {
        Self { top, left }
    }

    /// Shift by a pointer delta; saturates instead of overflowing.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            top: self.top.saturating_add(dy),
            left: self.left.saturating_add(dx),
        }
    }
}

/// Pointer coordinates in layout cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise `self - origin`, saturating.
    pub fn delta_from(self, origin: Point) -> (i32, i32) {
        (
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Signed floating rectangle origin with unsigned size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl FloatRect {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && (point.x as i64) < self.x as i64 + self.width as i64
            && (point.y as i64) < self.y as i64 + self.height as i64
    }

    /// Portion of the rectangle that lies inside `bounds`.
    pub fn visible_in(&self, bounds: Rect) -> Rect {
        let left = (self.x as i64).max(bounds.x as i64);
        let top = (self.y as i64).max(bounds.y as i64);
        let right = (self.x as i64 + self.width as i64).min(bounds.right() as i64);
        let bottom = (self.y as i64 + self.height as i64).min(bounds.bottom() as i64);
        if right <= left || bottom <= top {
            return Rect::default();
        }
        Rect {
            x: left as u16,
            y: top as u16,
            width: (right - left) as u16,
            height: (bottom - top) as u16,
        }
    }
}

/// Distinguishes concurrent pointer streams (one per mouse button).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerId(pub u8);

impl PointerId {
    pub const PRIMARY: PointerId = PointerId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub kind: PointerKind,
    pub at: Point,
}

impl PointerEvent {
    pub const fn new(pointer: PointerId, kind: PointerKind, at: Point) -> Self {
        Self { pointer, kind, at }
    }

    pub const fn down(x: i32, y: i32) -> Self {
        Self::new(PointerId::PRIMARY, PointerKind::Down, Point::new(x, y))
    }

    pub const fn moved(x: i32, y: i32) -> Self {
        Self::new(PointerId::PRIMARY, PointerKind::Move, Point::new(x, y))
    }

    pub const fn up(x: i32, y: i32) -> Self {
        Self::new(PointerId::PRIMARY, PointerKind::Up, Point::new(x, y))
    }

    /// Translate a terminal mouse report. Scrolls and bare hover moves
    /// carry no pointer transition and map to `None`.
    pub fn from_mouse(mouse: &MouseEvent) -> Option<Self> {
        let (button, kind) = match mouse.kind {
            MouseEventKind::Down(button) => (button, PointerKind::Down),
            MouseEventKind::Drag(button) => (button, PointerKind::Move),
            MouseEventKind::Up(button) => (button, PointerKind::Up),
            _ => return None,
        };
        let pointer = match button {
            MouseButton::Left => PointerId(0),
            MouseButton::Right => PointerId(1),
            MouseButton::Middle => PointerId(2),
        };
        Some(Self::new(
            pointer,
            kind,
            Point::new(mouse.column as i32, mouse.row as i32),
        ))
    }
}

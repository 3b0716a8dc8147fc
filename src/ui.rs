//! `UiFrame` clips every draw call to its area.
//!
//! Windows render into an offscreen buffer sized to the frame and are then
//! composited onto the terminal at signed coordinates, so a frame dragged
//! past the screen edge is simply cut off instead of writing out of bounds.
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::window::FloatRect;

pub struct UiFrame<'a> {
    area: Rect,
    buffer: &'a mut Buffer,
}

impl<'a> UiFrame<'a> {
    pub fn new(frame: &'a mut Frame<'_>) -> Self {
        let area = frame.area();
        let buffer = frame.buffer_mut();
        Self { area, buffer }
    }

    /// Draw target over an offscreen buffer.
    pub fn from_parts(area: Rect, buffer: &'a mut Buffer) -> Self {
        Self { area, buffer }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    fn clip_rect(&self, rect: Rect) -> Option<Rect> {
        let clipped = rect.intersection(self.area);
        if clipped.width == 0 || clipped.height == 0 {
            None
        } else {
            Some(clipped)
        }
    }

    pub fn render_widget<W>(&mut self, widget: W, area: Rect)
    where
        W: Widget,
    {
        if let Some(clipped) = self.clip_rect(area) {
            widget.render(clipped, self.buffer);
        }
    }

    /// Copy `src` (anchored at 0,0) so its origin lands on `dest`, which may
    /// lie partly or wholly off screen.
    pub fn blit_from_signed(&mut self, src: &Buffer, dest: FloatRect) {
        let frame_x0 = i32::from(self.area.x);
        let frame_y0 = i32::from(self.area.y);
        let frame_x1 = frame_x0 + i32::from(self.area.width);
        let frame_y1 = frame_y0 + i32::from(self.area.height);
        for sy in 0..i32::from(dest.height) {
            let dy = dest.y.saturating_add(sy);
            if dy < frame_y0 || dy >= frame_y1 {
                continue;
            }
            for sx in 0..i32::from(dest.width) {
                let dx = dest.x.saturating_add(sx);
                if dx < frame_x0 || dx >= frame_x1 {
                    continue;
                }
                if let (Some(src_cell), Some(dst_cell)) = (
                    src.cell((sx as u16, sy as u16)),
                    self.buffer.cell_mut((dx as u16, dy as u16)),
                ) {
                    *dst_cell = src_cell.clone();
                }
            }
        }
    }
}

/// Write `text` at (x, y), truncated to what fits inside `bounds`.
pub(crate) fn safe_set_string(
    buffer: &mut Buffer,
    bounds: Rect,
    x: u16,
    y: u16,
    text: &str,
    style: Style,
) {
    if bounds.width == 0 || bounds.height == 0 {
        return;
    }
    let max_x = bounds.x.saturating_add(bounds.width);
    let max_y = bounds.y.saturating_add(bounds.height);
    if x < bounds.x || x >= max_x || y < bounds.y || y >= max_y {
        return;
    }
    let available = max_x.saturating_sub(x);
    buffer.set_stringn(x, y, text, usize::from(available), style);
}

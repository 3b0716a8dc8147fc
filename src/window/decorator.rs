use ratatui::buffer::Buffer;
use ratatui::prelude::Rect;
use ratatui::style::{Modifier, Style};

use crate::ui::safe_set_string;
use crate::view::{AffordanceId, Marker, ValidatedTemplate, button_width};

/// A header button placed in frame-local columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSlot {
    pub id: AffordanceId,
    pub marker: Option<Marker>,
    pub label: String,
    pub offset: u16,
    pub width: u16,
}

/// Chrome geometry derived once from a validated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chrome {
    pub title: String,
    pub slots: Vec<HeaderSlot>,
}

impl Chrome {
    /// Buttons are right-aligned inside the header, in declaration order,
    /// leaving the corner cell for the border.
    pub fn from_template(template: &ValidatedTemplate) -> Self {
        let width = template.size().width;
        let buttons: Vec<_> = template.buttons().collect();
        let mut cursor = width.saturating_sub(1);
        let mut slots = Vec::with_capacity(buttons.len());
        for (id, label, marker) in buttons.into_iter().rev() {
            let slot_width = button_width(label);
            cursor = cursor.saturating_sub(slot_width);
            slots.push(HeaderSlot {
                id,
                marker,
                label: label.to_string(),
                offset: cursor.max(1),
                width: slot_width,
            });
        }
        slots.reverse();
        Self {
            title: template.title(),
            slots,
        }
    }

    /// Header slot under a frame-local column, if any.
    pub fn slot_at(&self, column: u16) -> Option<&HeaderSlot> {
        self.slots
            .iter()
            .find(|slot| column >= slot.offset && column < slot.offset.saturating_add(slot.width))
    }
}

pub trait WindowDecorator: std::fmt::Debug {
    /// Draw the frame chrome into a frame-sized buffer anchored at (0, 0).
    fn render_window(&self, buffer: &mut Buffer, chrome: &Chrome, focused: bool);
}

#[derive(Debug, Default)]
pub struct DefaultDecorator;

impl WindowDecorator for DefaultDecorator {
    fn render_window(&self, buffer: &mut Buffer, chrome: &Chrome, focused: bool) {
        let area = buffer.area;
        if area.width < 2 || area.height < 2 {
            return;
        }
        let header_style = if focused {
            Style::default()
                .bg(crate::theme::decorator_header_bg())
                .fg(crate::theme::decorator_header_fg())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .bg(crate::theme::decorator_header_inactive_bg())
                .fg(crate::theme::decorator_header_fg())
        };
        let border_style = Style::default().fg(crate::theme::decorator_border());
        let right = area.width - 1;
        let bottom = area.height - 1;

        for x in 0..area.width {
            if let Some(cell) = buffer.cell_mut((x, 0)) {
                cell.set_symbol(" ");
                cell.set_style(header_style);
            }
        }
        let title_room = chrome
            .slots
            .first()
            .map(|slot| slot.offset)
            .unwrap_or(right)
            .saturating_sub(2);
        let header = Rect::new(1, 0, title_room.saturating_add(1), 1);
        safe_set_string(buffer, header, 1, 0, &chrome.title, header_style);
        for slot in &chrome.slots {
            let style = match slot.marker {
                Some(Marker::Close) => header_style.fg(crate::theme::close_fg()),
                None => header_style,
            };
            let label = format!("[{}]", slot.label);
            safe_set_string(buffer, area, slot.offset, 0, &label, style);
        }

        for y in 1..bottom {
            for x in [0, right] {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    cell.set_symbol("│");
                    cell.set_style(border_style);
                }
            }
        }
        for x in 0..=right {
            if let Some(cell) = buffer.cell_mut((x, bottom)) {
                let symbol = if x == 0 {
                    "└"
                } else if x == right {
                    "┘"
                } else {
                    "─"
                };
                cell.set_symbol(symbol);
                cell.set_style(border_style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ViewNode, ViewTemplate};
    use crate::window::Size;

    fn chrome(width: u16) -> Chrome {
        let template = ViewTemplate::new(Size::new(width, 6))
            .child(ViewNode::header([
                ViewNode::title("Memory"),
                ViewNode::button("?"),
                ViewNode::close_button("X"),
            ]))
            .validate()
            .unwrap();
        Chrome::from_template(&template)
    }

    #[test]
    fn buttons_are_right_aligned_in_order() {
        let chrome = chrome(20);
        assert_eq!(chrome.title, "Memory");
        assert_eq!(chrome.slots.len(), 2);
        assert_eq!(chrome.slots[1].offset, 16);
        assert_eq!(chrome.slots[1].marker, Some(Marker::Close));
        assert_eq!(chrome.slots[0].offset, 13);
        assert_eq!(chrome.slot_at(17).map(|s| s.id), Some(AffordanceId(1)));
        assert_eq!(chrome.slot_at(14).map(|s| s.id), Some(AffordanceId(0)));
        assert!(chrome.slot_at(3).is_none());
    }

    #[test]
    fn tightest_header_keeps_close_reachable() {
        let template = ViewTemplate::new(Size::new(11, 6))
            .child(ViewNode::header([
                ViewNode::button("help"),
                ViewNode::close_button("X"),
            ]))
            .validate()
            .unwrap();
        let chrome = Chrome::from_template(&template);
        assert_eq!(chrome.slots[0].offset, 1);
        assert_eq!(chrome.slots[1].offset, 7);
        let reach_close: Vec<u16> = (0..11)
            .filter(|&col| {
                chrome.slot_at(col).and_then(|slot| slot.marker) == Some(Marker::Close)
            })
            .collect();
        assert_eq!(reach_close, vec![7, 8, 9]);
    }

    #[test]
    fn render_draws_close_button_and_borders() {
        let chrome = chrome(20);
        let mut buffer = Buffer::empty(Rect::new(0, 0, 20, 6));
        DefaultDecorator.render_window(&mut buffer, &chrome, true);
        assert_eq!(buffer.cell((17, 0)).unwrap().symbol(), "X");
        assert_eq!(buffer.cell((0, 5)).unwrap().symbol(), "└");
        assert_eq!(buffer.cell((19, 2)).unwrap().symbol(), "│");
        assert_eq!(buffer.cell((1, 0)).unwrap().symbol(), "M");
    }
}
